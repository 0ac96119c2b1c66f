use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Canvas created when a save is requested with no document open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlankDocument {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

impl Default for BlankDocument {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            dpi: 72,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub interval: Duration,
    pub activity_debounce: Duration,
    pub bridge_timeout: Duration,
    pub blank_document: BlankDocument,
    pub notifications_enabled: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_AUTOSAVE_INTERVAL,
            activity_debounce: crate::autosave::activity::DEFAULT_ACTIVITY_DEBOUNCE,
            bridge_timeout: DEFAULT_BRIDGE_TIMEOUT,
            blank_document: BlankDocument::default(),
            notifications_enabled: true,
        }
    }
}
