use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_ACTIVITY_DEBOUNCE: Duration = Duration::from_secs(5);

/// Proxy signals that the user is probably changing the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivitySource {
    FocusLost,
    PointerEnter,
    PointerMove,
    EditorMessage,
}

/// Debounced "dirty since last save" flag.
///
/// Bursts of low-level signals collapse into a single dirty transition per
/// debounce window.
#[derive(Debug)]
pub struct ActivityTracker {
    debounce: Duration,
    last_activity: Option<Instant>,
    dirty: bool,
}

impl ActivityTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_activity: None,
            dirty: false,
        }
    }

    /// Returns true when the signal was recorded, false when it fell inside
    /// the current debounce window.
    pub fn register(&mut self, source: ActivitySource, now: Instant) -> bool {
        let outside_window = match self.last_activity {
            Some(last) => now.saturating_duration_since(last) > self.debounce,
            None => true,
        };

        if outside_window {
            self.last_activity = Some(now);
            self.dirty = true;
            log::debug!("Activity registered from {:?}", source);
        }

        outside_window
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Clears the flag and returns what it was.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn restore_dirty(&mut self, was_dirty: bool) {
        self.dirty |= was_dirty;
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_DEBOUNCE)
    }
}
