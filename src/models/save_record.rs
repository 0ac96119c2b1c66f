use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_PREFIX: &str = "autosave_";
pub const SNAPSHOT_EXTENSION: &str = "psd";

const FILENAME_TIME_FORMAT: &str = "%d-%m-%Y_%H-%M-%S";

/// Identity of one snapshot on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub filename: String,
    pub timestamp: Option<DateTime<Local>>,
}

impl SaveRecord {
    pub fn at(now: DateTime<Local>) -> Self {
        Self {
            filename: snapshot_filename(now),
            timestamp: Some(now),
        }
    }

    /// Builds a record from a filename found on disk or in the pointer file.
    /// Names that don't follow the snapshot pattern keep a `None` timestamp.
    pub fn from_filename(filename: &str) -> Self {
        let filename = filename.trim().to_string();
        let timestamp = parse_snapshot_time(&filename);
        Self { filename, timestamp }
    }

    /// Human readable "HH:MM:SS - DD/MM/YYYY", or the raw filename.
    pub fn display_label(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%H:%M:%S - %d/%m/%Y").to_string(),
            None => self.filename.clone(),
        }
    }
}

/// `autosave_DD-MM-YYYY_HH-mm-ss.psd` in local wall-clock time.
pub fn snapshot_filename(now: DateTime<Local>) -> String {
    format!(
        "{SNAPSHOT_PREFIX}{}.{SNAPSHOT_EXTENSION}",
        now.format(FILENAME_TIME_FORMAT)
    )
}

pub fn is_snapshot_filename(name: &str) -> bool {
    name.starts_with(SNAPSHOT_PREFIX)
        && name
            .rsplit_once('.')
            .map(|(_, ext)| ext.eq_ignore_ascii_case(SNAPSHOT_EXTENSION))
            .unwrap_or(false)
}

fn parse_snapshot_time(filename: &str) -> Option<DateTime<Local>> {
    let stem = filename
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(&format!(".{SNAPSHOT_EXTENSION}"))?;
    let naive = NaiveDateTime::parse_from_str(stem, FILENAME_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}
