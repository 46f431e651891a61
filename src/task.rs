// Task record and timestamp helpers

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A single to-do item.
///
/// `id` and `created_at` are fixed at creation; only `text` and
/// `completed` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub(crate) fn new(id: String, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at,
        }
    }
}

/// Generate a fresh task id (UUIDv7, time-ordered)
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Source of creation timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to milliseconds so stored timestamps round-trip exactly
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}
