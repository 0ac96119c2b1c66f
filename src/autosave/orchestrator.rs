//! Save/load cycles against the editor and the snapshot store.
//!
//! The editor answers serialization requests with a bare byte payload and no
//! request id, so at most one request may be outstanding. The pending slot
//! records what the next payload is for.

use crate::autosave::bridge::{self, EditorBridge, PSD_MIME};
use crate::autosave::config::BlankDocument;
use crate::autosave::error::{AutosaveError, Result};
use crate::autosave::storage::SnapshotStore;
use crate::models::save_record::SaveRecord;
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Save,
    Export,
}

impl PendingKind {
    pub fn label(self) -> &'static str {
        match self {
            PendingKind::Save => "save",
            PendingKind::Export => "export",
        }
    }
}

#[derive(Debug)]
struct PendingRequest {
    id: u64,
    kind: PendingKind,
    was_dirty: bool,
    timeout: JoinHandle<()>,
}

/// A request that ended without a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiredRequest {
    pub kind: PendingKind,
    pub was_dirty: bool,
}

#[derive(Debug)]
pub enum PayloadOutcome {
    /// No request was waiting for this payload.
    Unsolicited,
    Saved(SaveRecord),
    ExportReady(Vec<u8>),
    Failed {
        kind: PendingKind,
        was_dirty: bool,
        error: AutosaveError,
    },
}

pub struct Orchestrator {
    store: SnapshotStore,
    bridge: Arc<dyn EditorBridge>,
    pending: Option<PendingRequest>,
    next_request_id: u64,
    last_successful_save: Option<DateTime<Local>>,
}

impl Orchestrator {
    pub fn new(store: SnapshotStore, bridge: Arc<dyn EditorBridge>) -> Self {
        Self {
            store,
            bridge,
            pending: None,
            next_request_id: 1,
            last_successful_save: None,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn pending_kind(&self) -> Option<PendingKind> {
        self.pending.as_ref().map(|p| p.kind)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_successful_save(&self) -> Option<DateTime<Local>> {
        self.last_successful_save
    }

    /// Sends the serialization script and occupies the pending slot.
    /// `on_timeout` receives the request id once `timeout` elapses.
    pub fn begin<F>(
        &mut self,
        kind: PendingKind,
        was_dirty: bool,
        blank: &BlankDocument,
        timeout: Duration,
        on_timeout: F,
    ) -> Result<u64>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        if let Some(pending) = &self.pending {
            return Err(AutosaveError::SaveInProgress(pending.kind.label()));
        }

        self.bridge
            .send(&bridge::save_script(blank))
            .map_err(AutosaveError::BridgeSend)?;

        let id = self.next_request_id;
        self.next_request_id += 1;

        let timeout = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            on_timeout(id);
        });

        self.pending = Some(PendingRequest {
            id,
            kind,
            was_dirty,
            timeout,
        });
        log::info!("Requested {} #{} from the editor", kind.label(), id);
        Ok(id)
    }

    pub fn receive_payload(&mut self, bytes: Vec<u8>) -> PayloadOutcome {
        let Some(pending) = self.pending.take() else {
            return PayloadOutcome::Unsolicited;
        };
        pending.timeout.abort();
        log::info!(
            "Received {} bytes for {} #{}",
            bytes.len(),
            pending.kind.label(),
            pending.id
        );

        if bytes.is_empty() {
            return PayloadOutcome::Failed {
                kind: pending.kind,
                was_dirty: pending.was_dirty,
                error: AutosaveError::EmptyDocument,
            };
        }

        match pending.kind {
            PendingKind::Export => PayloadOutcome::ExportReady(bytes),
            PendingKind::Save => match self.persist(&bytes) {
                Ok(record) => PayloadOutcome::Saved(record),
                Err(error) => PayloadOutcome::Failed {
                    kind: PendingKind::Save,
                    was_dirty: pending.was_dirty,
                    error,
                },
            },
        }
    }

    /// Frees the slot if `id` is still the outstanding request. Stale ids
    /// (the payload already arrived) are ignored.
    pub fn expire(&mut self, id: u64) -> Option<ExpiredRequest> {
        if self.pending.as_ref().map(|p| p.id) != Some(id) {
            return None;
        }
        let pending = self.pending.take()?;
        log::warn!("{} #{} timed out waiting for the editor", pending.kind.label(), id);
        Some(ExpiredRequest {
            kind: pending.kind,
            was_dirty: pending.was_dirty,
        })
    }

    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timeout.abort();
            log::info!("Dropped pending {} #{}", pending.kind.label(), pending.id);
        }
    }

    /// Opens the most recent snapshot as a new editor document.
    pub fn load_last(&self) -> Result<SaveRecord> {
        let name = self.store.read_pointer()?.ok_or(AutosaveError::NoPriorSave)?;
        let bytes = self.store.read(&name)?;
        self.bridge
            .send(&bridge::open_document_script(PSD_MIME, &bytes))
            .map_err(AutosaveError::BridgeSend)?;
        log::info!("Opened {} ({} bytes) as a new document", name, bytes.len());
        Ok(SaveRecord::from_filename(&name))
    }

    pub fn import(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let mime = bridge::mime_for_file_name(file_name);
        self.bridge
            .send(&bridge::open_document_script(mime, bytes))
            .map_err(AutosaveError::BridgeSend)?;
        log::info!("Imported {} as {}", file_name, mime);
        Ok(())
    }

    /// Save record named by the pointer, for the status line.
    pub fn last_save(&self) -> Option<SaveRecord> {
        match self.store.read_pointer() {
            Ok(name) => name.map(|name| SaveRecord::from_filename(&name)),
            Err(e) => {
                log::warn!("Could not read last save pointer: {}", e);
                None
            }
        }
    }

    pub fn prepare_folder(&self) -> Result<&Path> {
        self.store.ensure_dir()?;
        Ok(self.store.dir())
    }

    fn persist(&mut self, bytes: &[u8]) -> Result<SaveRecord> {
        let now = Local::now();
        let record = SaveRecord::at(now);
        let path = self.store.write(&record.filename, bytes)?;
        self.store.write_pointer(&record.filename)?;
        self.last_successful_save = Some(now);
        log::info!("Snapshot written to {}", path.display());
        Ok(record)
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
