// View filtering and ordering for tasks

use crate::error::TaskError;
use crate::task::Task;
use std::str::FromStr;

/// Which tasks a view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

impl FromStr for Filter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(TaskError::Validation(format!(
                "invalid filter: {} (expected all, active or completed)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Active => write!(f, "active"),
            Filter::Completed => write!(f, "completed"),
        }
    }
}

/// Ordering of a view by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for SortOrder {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            other => Err(TaskError::Validation(format!(
                "invalid sort order: {} (expected newest or oldest)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Newest => write!(f, "newest"),
            SortOrder::Oldest => write!(f, "oldest"),
        }
    }
}

/// Filter and sort `tasks`.
///
/// `tasks` is in storage order, newest insertion first. Ties on
/// `created_at` follow insertion order in the direction of the sort:
/// later additions first under `Newest`, earlier additions first under
/// `Oldest`.
pub fn apply(tasks: &[Task], filter: Filter, order: SortOrder) -> Vec<&Task> {
    let matching = tasks.iter().filter(|t| filter.matches(t));
    match order {
        SortOrder::Newest => {
            let mut view: Vec<&Task> = matching.collect();
            view.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            view
        }
        SortOrder::Oldest => {
            // Walk oldest insertion first so the stable sort keeps it ahead on ties
            let mut view: Vec<&Task> = matching.rev().collect();
            view.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            view
        }
    }
}

/// Aggregate counts over the whole collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            active: tasks.len() - completed,
            completed,
        }
    }
}
