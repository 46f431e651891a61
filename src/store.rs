// TaskStore: owner of the task collection and view preferences

use crate::error::{PersistenceError, Result, TaskError};
use crate::filter::{self, Filter, SortOrder, Stats};
use crate::persist::PersistenceAdapter;
use crate::prefs::{self, FocusMode, Preferences, Theme};
use crate::task::{self, Clock, SystemClock, Task};
use chrono::Duration;
use tracing::{debug, info, warn};

/// Spacing between synthesized timestamps in a sample batch
const SAMPLE_SPACING_MINUTES: i64 = 30;

/// Result of a state-changing operation.
///
/// The mutation has always been applied in memory. `persist_error` is set
/// when writing it through to storage failed.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub persist_error: Option<PersistenceError>,
}

impl<T> Outcome<T> {
    fn new(value: T, persisted: std::result::Result<(), PersistenceError>) -> Self {
        Self {
            value,
            persist_error: persisted.err(),
        }
    }

    pub fn is_durable(&self) -> bool {
        self.persist_error.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Turn a failed save into an error, for callers that require durability
    pub fn durable(self) -> Result<T> {
        match self.persist_error {
            Some(e) => Err(TaskError::Persistence(e)),
            None => Ok(self.value),
        }
    }
}

/// The task collection plus filter, sort order, theme and focus mode.
///
/// Every mutation goes through here and is written through to the
/// adapter before returning. Tasks are held newest-first.
pub struct TaskStore<P: PersistenceAdapter> {
    tasks: Vec<Task>,
    filter: Filter,
    prefs: Preferences,
    adapter: P,
    clock: Box<dyn Clock>,
}

impl<P: PersistenceAdapter> TaskStore<P> {
    pub fn new(adapter: P) -> Self {
        Self::with_clock(adapter, Box::new(SystemClock))
    }

    /// Construct with an explicit timestamp source
    pub fn with_clock(adapter: P, clock: Box<dyn Clock>) -> Self {
        let tasks = adapter.load();
        let prefs = Preferences {
            sort_order: prefs::parse_or_default(
                prefs::SORT_ORDER_KEY,
                adapter.load_preference(prefs::SORT_ORDER_KEY),
            ),
            theme: prefs::parse_or_default(prefs::THEME_KEY, adapter.load_preference(prefs::THEME_KEY)),
            focus_mode: prefs::parse_or_default(
                prefs::FOCUS_MODE_KEY,
                adapter.load_preference(prefs::FOCUS_MODE_KEY),
            ),
        };

        info!(count = tasks.len(), ?prefs, "Opened task store");

        Self {
            tasks,
            filter: Filter::default(),
            prefs,
            adapter,
            clock,
        }
    }

    pub fn adapter(&self) -> &P {
        &self.adapter
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All tasks in storage order (newest insertions first)
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look up a task by a unique id prefix
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&Task> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(TaskError::Validation("task id cannot be empty".to_string()));
        }
        if let Some(task) = self.get(prefix) {
            return Ok(task);
        }

        let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task),
            (Some(_), Some(_)) => Err(TaskError::Validation(format!("task id prefix {} is ambiguous", prefix))),
            (None, _) => Err(TaskError::NotFound(prefix.to_string())),
        }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn sort_order(&self) -> SortOrder {
        self.prefs.sort_order
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    /// Tasks matching the current filter, in the current sort order
    pub fn view(&self) -> Vec<&Task> {
        filter::apply(&self.tasks, self.filter, self.prefs.sort_order)
    }

    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a task from `text` and insert it as the newest entry
    pub fn add_task(&mut self, text: &str) -> Result<Outcome<Task>> {
        let text = validate_text(text)?;
        let task = Task::new(self.fresh_id(), text, self.clock.now());

        self.tasks.insert(0, task.clone());
        debug!(id = %task.id, "Added task");

        Ok(Outcome::new(task, self.persist()))
    }

    /// Replace a task's text; completion and creation time are untouched
    pub fn update_task(&mut self, id: &str, new_text: &str) -> Result<Outcome<Task>> {
        let index = self.position(id)?;
        let text = validate_text(new_text)?;

        let task = &mut self.tasks[index];
        task.text = text;
        let task = task.clone();
        debug!(id, "Updated task text");

        Ok(Outcome::new(task, self.persist()))
    }

    pub fn toggle_task(&mut self, id: &str) -> Result<Outcome<Task>> {
        let index = self.position(id)?;

        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        let task = task.clone();
        debug!(id, completed = task.completed, "Toggled task");

        Ok(Outcome::new(task, self.persist()))
    }

    /// Remove a task, returning it
    pub fn delete_task(&mut self, id: &str) -> Result<Outcome<Task>> {
        let index = self.position(id)?;
        let task = self.tasks.remove(index);
        debug!(id, "Deleted task");

        Ok(Outcome::new(task, self.persist()))
    }

    /// Remove every completed task, returning how many were removed
    pub fn clear_completed(&mut self) -> Outcome<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        debug!(removed, "Cleared completed tasks");

        Outcome::new(removed, self.persist())
    }

    /// Bulk-create tasks from `(text, completed)` pairs.
    ///
    /// The batch is prepended with strictly decreasing timestamps, so the
    /// first entry is the newest. Nothing is inserted if any text is empty.
    pub fn seed_sample<S: AsRef<str>>(&mut self, samples: &[(S, bool)]) -> Result<Outcome<Vec<Task>>> {
        let texts = samples
            .iter()
            .map(|(text, _)| validate_text(text.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let now = self.clock.now();
        let mut batch = Vec::with_capacity(samples.len());
        for (i, (text, (_, completed))) in texts.into_iter().zip(samples).enumerate() {
            let created_at = now - Duration::minutes(SAMPLE_SPACING_MINUTES * i as i64);
            let mut task = Task::new(self.fresh_id_excluding(&batch), text, created_at);
            task.completed = *completed;
            batch.push(task);
        }

        info!(count = batch.len(), "Seeding sample tasks");
        let mut tasks = batch.clone();
        tasks.append(&mut self.tasks);
        self.tasks = tasks;

        Ok(Outcome::new(batch, self.persist()))
    }

    // ========================================================================
    // View state
    // ========================================================================

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Set the sort order and persist the preference
    pub fn set_sort_order(&mut self, order: SortOrder) -> Outcome<()> {
        self.prefs.sort_order = order;
        let persisted = self.persist_preference(prefs::SORT_ORDER_KEY, &order.to_string());
        Outcome::new((), persisted)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Outcome<Theme> {
        self.prefs.theme = theme;
        let persisted = self.persist_preference(prefs::THEME_KEY, &theme.to_string());
        Outcome::new(theme, persisted)
    }

    pub fn toggle_theme(&mut self) -> Outcome<Theme> {
        self.set_theme(self.prefs.theme.toggled())
    }

    pub fn set_focus_mode(&mut self, mode: FocusMode) -> Outcome<FocusMode> {
        self.prefs.focus_mode = mode;
        let persisted = self.persist_preference(prefs::FOCUS_MODE_KEY, &mode.to_string());
        Outcome::new(mode, persisted)
    }

    pub fn toggle_focus_mode(&mut self) -> Outcome<FocusMode> {
        self.set_focus_mode(self.prefs.focus_mode.toggled())
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn position(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn fresh_id(&self) -> String {
        self.fresh_id_excluding(&[])
    }

    fn fresh_id_excluding(&self, pending: &[Task]) -> String {
        loop {
            let id = task::new_id();
            if self.get(&id).is_none() && !pending.iter().any(|t| t.id == id) {
                return id;
            }
        }
    }

    fn persist(&mut self) -> std::result::Result<(), PersistenceError> {
        self.adapter.save(&self.tasks).inspect_err(|e| {
            warn!(error = %e, count = self.tasks.len(), "Failed to persist tasks; keeping in-memory state");
        })
    }

    fn persist_preference(&mut self, key: &str, value: &str) -> std::result::Result<(), PersistenceError> {
        self.adapter
            .save_preference(key, value)
            .inspect_err(|e| warn!(key, value, error = %e, "Failed to persist preference"))
    }
}

/// Trim `text` and reject it if nothing is left
fn validate_text(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TaskError::Validation("task text cannot be empty".to_string()));
    }
    Ok(text.to_string())
}

/// Built-in demo batch, newest first
pub fn sample_tasks() -> Vec<(&'static str, bool)> {
    vec![
        ("Review pull requests", false),
        ("Write weekly status update", false),
        ("Book dentist appointment", true),
        ("Buy groceries", false),
        ("Renew library books", true),
        ("Plan weekend hike", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{KeyValueStore, MemoryStore};
    use crate::persist::KvAdapter;
    use crate::prefs::{SORT_ORDER_KEY, TASKS_KEY, THEME_KEY};
    use chrono::{DateTime, TimeZone, Utc};
    use std::cell::Cell;

    /// Clock that advances one second per call
    struct StepClock {
        next: Cell<i64>,
    }

    impl StepClock {
        fn boxed(start: i64) -> Box<dyn Clock> {
            Box::new(Self { next: Cell::new(start) })
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.next.get();
            self.next.set(secs + 1);
            Utc.timestamp_opt(secs, 0).unwrap()
        }
    }

    type MemTaskStore = TaskStore<KvAdapter<MemoryStore>>;

    fn store() -> MemTaskStore {
        TaskStore::with_clock(KvAdapter::new(MemoryStore::new()), StepClock::boxed(1_700_000_000))
    }

    fn texts(store: &MemTaskStore) -> Vec<String> {
        store.view().iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn test_add_task() {
        let mut store = store();

        let task = store.add_task("  Buy milk  ").unwrap().into_value();
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&task.id), Some(&task));
    }

    #[test]
    fn test_add_task_rejects_empty_text() {
        let mut store = store();
        store.add_task("keep").unwrap();

        for text in ["", "   ", "\t\n"] {
            let err = store.add_task(text).unwrap_err();
            assert!(matches!(err, TaskError::Validation(_)));
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_task_only_changes_text() {
        let mut store = store();
        let original = store.add_task("Buy milk").unwrap().into_value();
        store.toggle_task(&original.id).unwrap();

        let updated = store.update_task(&original.id, " Buy oat milk ").unwrap().into_value();
        assert_eq!(updated.text, "Buy oat milk");
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.completed);
    }

    #[test]
    fn test_update_task_errors() {
        let mut store = store();
        let task = store.add_task("Buy milk").unwrap().into_value();

        assert!(matches!(store.update_task("missing", "x"), Err(TaskError::NotFound(_))));
        assert!(matches!(store.update_task(&task.id, "  "), Err(TaskError::Validation(_))));
        assert_eq!(store.get(&task.id).unwrap().text, "Buy milk");
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut store = store();
        let task = store.add_task("Buy milk").unwrap().into_value();

        assert!(store.toggle_task(&task.id).unwrap().value.completed);
        assert!(!store.toggle_task(&task.id).unwrap().value.completed);
        assert_eq!(store.len(), 1);
        assert!(matches!(store.toggle_task("missing"), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_delete_twice_is_not_found() {
        let mut store = store();
        let task = store.add_task("Buy milk").unwrap().into_value();

        let deleted = store.delete_task(&task.id).unwrap().into_value();
        assert_eq!(deleted.id, task.id);
        assert!(store.is_empty());

        assert!(matches!(store.delete_task(&task.id), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_clear_completed() {
        let mut store = store();
        for text in ["a", "b", "c", "d"] {
            store.add_task(text).unwrap();
        }

        assert_eq!(store.clear_completed().into_value(), 0);
        assert_eq!(store.len(), 4);

        let ids: Vec<String> = store.tasks().iter().take(3).map(|t| t.id.clone()).collect();
        for id in &ids {
            store.toggle_task(id).unwrap();
        }
        assert_eq!(store.clear_completed().into_value(), 3);
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].text, "a");
    }

    #[test]
    fn test_view_sort_orders() {
        let mut store = store();
        store.add_task("first").unwrap();
        store.add_task("second").unwrap();
        store.add_task("third").unwrap();

        assert_eq!(texts(&store), ["third", "second", "first"]);

        store.set_sort_order(SortOrder::Oldest).into_value();
        assert_eq!(texts(&store), ["first", "second", "third"]);
    }

    /// Clock that never advances
    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn frozen_store() -> MemTaskStore {
        let clock = Frozen(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        TaskStore::with_clock(KvAdapter::new(MemoryStore::new()), Box::new(clock))
    }

    #[test]
    fn test_view_equal_timestamps_newest_insert_first() {
        let mut store = frozen_store();
        store.add_task("Buy milk").unwrap();
        store.add_task("Walk dog").unwrap();

        assert_eq!(texts(&store), ["Walk dog", "Buy milk"]);
    }

    #[test]
    fn test_view_equal_timestamps_oldest_insert_first() {
        let mut store = frozen_store();
        store.add_task("Buy milk").unwrap();
        store.add_task("Walk dog").unwrap();
        store.add_task("Call mom").unwrap();

        store.set_sort_order(SortOrder::Oldest).into_value();
        assert_eq!(texts(&store), ["Buy milk", "Walk dog", "Call mom"]);

        store.set_filter(Filter::Active);
        assert_eq!(texts(&store), ["Buy milk", "Walk dog", "Call mom"]);
    }

    #[test]
    fn test_view_filters() {
        let mut store = store();
        let a = store.add_task("a").unwrap().into_value();
        store.add_task("b").unwrap();
        let c = store.add_task("c").unwrap().into_value();
        store.toggle_task(&a.id).unwrap();
        store.toggle_task(&c.id).unwrap();

        store.set_filter(Filter::Active);
        assert_eq!(texts(&store), ["b"]);

        store.set_filter(Filter::Completed);
        assert_eq!(texts(&store), ["c", "a"]);

        store.set_sort_order(SortOrder::Oldest).into_value();
        assert_eq!(texts(&store), ["a", "c"]);

        store.set_filter(Filter::All);
        assert_eq!(texts(&store), ["a", "b", "c"]);
        assert_eq!(store.stats(), Stats { total: 3, active: 1, completed: 2 });
    }

    #[test]
    fn test_buy_milk_walk_dog_scenario() {
        let mut store = store();
        let milk = store.add_task("Buy milk").unwrap().into_value();
        store.add_task("Walk dog").unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(texts(&store), ["Walk dog", "Buy milk"]);

        store.toggle_task(&milk.id).unwrap();
        assert_eq!(store.clear_completed().into_value(), 1);
        assert_eq!(texts(&store), ["Walk dog"]);
    }

    #[test]
    fn test_seed_sample_prepends_batch() {
        let mut store = store();
        let existing = store.add_task("existing").unwrap().into_value();

        let batch = store
            .seed_sample(&[("one", false), ("two", true), ("three", false)])
            .unwrap()
            .into_value();

        assert_eq!(batch.len(), 3);
        assert!(batch.windows(2).all(|w| w[0].created_at > w[1].created_at));
        assert!(batch[1].completed);

        let stored: Vec<&str> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(stored, ["one", "two", "three", "existing"]);
        assert_eq!(store.get(&existing.id), Some(&existing));
    }

    #[test]
    fn test_seed_sample_rejects_whole_batch() {
        let mut store = store();
        let err = store.seed_sample(&[("ok", false), ("  ", false)]).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_seed_builtin_samples() {
        let mut store = store();
        let samples = sample_tasks();
        let batch = store.seed_sample(&samples).unwrap().into_value();
        assert_eq!(batch.len(), samples.len());
        assert_eq!(store.view()[0].text, samples[0].0);
    }

    #[test]
    fn test_ids_unique() {
        let mut store = store();
        store.seed_sample(&sample_tasks()).unwrap();
        store.add_task("extra").unwrap();

        let mut ids: Vec<&str> = store.tasks().iter().map(|t| t.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn test_every_mutation_writes_through() {
        let mut store = store();
        let task = store.add_task("Buy milk").unwrap().into_value();
        store.toggle_task(&task.id).unwrap();

        let reopened = TaskStore::new(KvAdapter::new(store.adapter().kv().clone()));
        assert_eq!(reopened.tasks(), store.tasks());
        assert!(reopened.tasks()[0].completed);
    }

    #[test]
    fn test_save_failure_is_non_fatal() {
        let mut store = TaskStore::with_clock(KvAdapter::new(MemoryStore::with_quota(8)), StepClock::boxed(0));

        let outcome = store.add_task("Buy milk").unwrap();
        assert!(!outcome.is_durable());
        assert!(matches!(
            outcome.persist_error,
            Some(PersistenceError::QuotaExceeded { .. })
        ));

        // Memory stays the source of truth and further operations proceed
        assert_eq!(store.len(), 1);
        let id = store.tasks()[0].id.clone();
        let err = store.toggle_task(&id).unwrap().durable().unwrap_err();
        assert!(matches!(err, TaskError::Persistence(_)));
        assert!(store.tasks()[0].completed);
    }

    #[test]
    fn test_preferences_persist_and_reload() {
        let mut store = store();
        assert_eq!(store.preferences(), Preferences::default());

        store.set_sort_order(SortOrder::Oldest).into_value();
        assert_eq!(store.toggle_theme().into_value(), Theme::Dark);
        assert_eq!(store.toggle_focus_mode().into_value(), FocusMode::On);
        store.set_filter(Filter::Completed);

        let kv = store.adapter().kv().clone();
        assert_eq!(kv.get(SORT_ORDER_KEY).unwrap().as_deref(), Some("oldest"));
        assert_eq!(kv.get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        let reopened = TaskStore::new(KvAdapter::new(kv));
        assert_eq!(reopened.sort_order(), SortOrder::Oldest);
        assert_eq!(reopened.preferences().theme, Theme::Dark);
        assert!(reopened.preferences().focus_mode.is_on());
        // The filter is session-only
        assert_eq!(reopened.filter(), Filter::All);
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let mut kv = MemoryStore::new();
        kv.set(TASKS_KEY, "[{\"id\":").unwrap();
        kv.set(SORT_ORDER_KEY, "sideways").unwrap();

        let store = TaskStore::new(KvAdapter::new(kv));
        assert!(store.is_empty());
        assert_eq!(store.sort_order(), SortOrder::Newest);
    }

    #[test]
    fn test_find_by_prefix() {
        let mut store = store();
        let task = store.add_task("Buy milk").unwrap().into_value();

        assert_eq!(store.find_by_prefix(&task.id).unwrap().id, task.id);
        assert_eq!(store.find_by_prefix(&task.id[..8]).unwrap().id, task.id);
        assert!(matches!(store.find_by_prefix("zzz"), Err(TaskError::NotFound(_))));
        assert!(matches!(store.find_by_prefix(" "), Err(TaskError::Validation(_))));
    }
}
