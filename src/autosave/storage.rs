use crate::autosave::error::{AutosaveError, Result};
use crate::models::save_record::{is_snapshot_filename, SaveRecord};
use std::fs;
use std::path::{Path, PathBuf};

pub const POINTER_FILE: &str = "last_save.txt";

/// Flat directory of snapshots plus the most-recent-save pointer.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| AutosaveError::storage(&self.dir, e))
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|e| AutosaveError::storage(&path, e))?;
        Ok(path)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        fs::read(&path).map_err(|e| AutosaveError::storage(&path, e))
    }

    /// `Ok(None)` when no save has ever been recorded. The pointer may only
    /// name a snapshot inside this directory.
    pub fn read_pointer(&self) -> Result<Option<String>> {
        let path = self.pointer_path();
        match fs::read_to_string(&path) {
            Ok(raw) => match raw.trim() {
                "" => Ok(None),
                name if is_local_snapshot(name) => Ok(Some(name.to_string())),
                name => Err(AutosaveError::InvalidPointer(name.to_string())),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AutosaveError::storage(&path, e)),
        }
    }

    pub fn write_pointer(&self, name: &str) -> Result<()> {
        let path = self.pointer_path();
        fs::write(&path, name).map_err(|e| AutosaveError::storage(&path, e))
    }

    /// Snapshots on disk, newest first.
    pub fn list(&self) -> Result<Vec<SaveRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AutosaveError::storage(&self.dir, e)),
        };

        let mut records: Vec<SaveRecord> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| is_snapshot_filename(name))
            .map(|name| SaveRecord::from_filename(&name))
            .collect();

        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(records)
    }

    fn pointer_path(&self) -> PathBuf {
        self.dir.join(POINTER_FILE)
    }
}

fn is_local_snapshot(name: &str) -> bool {
    !name.contains(|c: char| c == '/' || c == '\\') && is_snapshot_filename(name)
}

/// Writes a snapshot outside the managed directory (exports).
pub fn write_external(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|e| AutosaveError::storage(path, e))
}
