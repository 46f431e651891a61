// View preferences persisted as plain strings under well-known keys

use crate::error::TaskError;
use crate::filter::SortOrder;
use std::str::FromStr;

/// Storage key for the serialized task array
pub const TASKS_KEY: &str = "tasks";
pub const SORT_ORDER_KEY: &str = "sortOrder";
pub const THEME_KEY: &str = "theme";
pub const FOCUS_MODE_KEY: &str = "focusMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(TaskError::Validation(format!("invalid theme: {} (expected light or dark)", other))),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    On,
    #[default]
    Off,
}

impl FocusMode {
    pub fn toggled(self) -> Self {
        match self {
            FocusMode::On => FocusMode::Off,
            FocusMode::Off => FocusMode::On,
        }
    }

    pub fn is_on(self) -> bool {
        self == FocusMode::On
    }
}

impl FromStr for FocusMode {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(FocusMode::On),
            "off" => Ok(FocusMode::Off),
            other => Err(TaskError::Validation(format!("invalid focus mode: {} (expected on or off)", other))),
        }
    }
}

impl std::fmt::Display for FocusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FocusMode::On => write!(f, "on"),
            FocusMode::Off => write!(f, "off"),
        }
    }
}

/// Persisted view state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub sort_order: SortOrder,
    pub theme: Theme,
    pub focus_mode: FocusMode,
}

/// Parse a stored preference, falling back to the default on absent or unknown values
pub(crate) fn parse_or_default<T>(key: &str, raw: Option<String>) -> T
where
    T: FromStr<Err = TaskError> + Default,
{
    let Some(raw) = raw else {
        return T::default();
    };
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring unreadable preference");
            T::default()
        }
    }
}
