use crate::models::save_record::SaveRecord;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    Disabled,
    Idle,
    Saving,
    Exporting,
    Loading,
}

/// Snapshot of the autosave state pushed to the status bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveStatus {
    pub enabled: bool,
    pub phase: SchedulerPhase,
    pub dirty: bool,
    pub message: String,
    pub last_save: Option<SaveRecord>,
    pub last_successful_save_at: Option<DateTime<Local>>,
    pub autosave_dir: String,
}
