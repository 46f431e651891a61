// TaskList - single-user task list with write-through local persistence

pub mod backend;
pub mod editing;
pub mod error;
pub mod filter;
pub mod persist;
pub mod prefs;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use backend::{KeyValueStore, MemoryStore, SqliteStore};
pub use editing::{EditState, Editor};
pub use error::{PersistenceError, TaskError};
pub use filter::{Filter, SortOrder, Stats};
pub use persist::{KvAdapter, PersistenceAdapter};
pub use prefs::{FocusMode, Preferences, Theme};
pub use store::{Outcome, TaskStore, sample_tasks};
pub use task::{Clock, SystemClock, Task};
