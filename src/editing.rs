// Add/edit dispatch for text submissions

use crate::error::{Result, TaskError};
use crate::persist::PersistenceAdapter;
use crate::store::{Outcome, TaskStore};
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing(String),
}

/// Tracks whether the next submitted text creates a task or edits one
///
/// ```
/// use tasklist::{Editor, KvAdapter, MemoryStore, TaskStore};
///
/// let mut store = TaskStore::new(KvAdapter::new(MemoryStore::new()));
/// let mut editor = Editor::new();
///
/// let task = editor.submit(&mut store, "Buy milk").unwrap().into_value();
///
/// editor.begin(&store, &task.id).unwrap();
/// editor.submit(&mut store, "Buy oat milk").unwrap();
///
/// assert_eq!(store.len(), 1);
/// assert_eq!(store.get(&task.id).unwrap().text, "Buy oat milk");
/// assert_eq!(editor.editing_id(), None);
/// ```
#[derive(Debug, Default)]
pub struct Editor {
    state: EditState,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn editing_id(&self) -> Option<&str> {
        match &self.state {
            EditState::Idle => None,
            EditState::Editing(id) => Some(id),
        }
    }

    /// Start editing `id`, replacing any edit in progress
    pub fn begin<'s, P: PersistenceAdapter>(&mut self, store: &'s TaskStore<P>, id: &str) -> Result<&'s Task> {
        let task = store.get(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        self.state = EditState::Editing(task.id.clone());
        Ok(task)
    }

    pub fn cancel(&mut self) {
        self.state = EditState::Idle;
    }

    /// Add a task when idle, otherwise update the task being edited.
    ///
    /// A validation failure keeps the current state so the text can be
    /// corrected. An edit whose task has disappeared returns to idle.
    pub fn submit<P: PersistenceAdapter>(&mut self, store: &mut TaskStore<P>, text: &str) -> Result<Outcome<Task>> {
        let EditState::Editing(id) = &self.state else {
            return store.add_task(text);
        };

        match store.update_task(id, text) {
            Ok(outcome) => {
                self.state = EditState::Idle;
                Ok(outcome)
            }
            Err(e @ TaskError::NotFound(_)) => {
                self.state = EditState::Idle;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
