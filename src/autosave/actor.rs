//! The autosave actor: one task that owns the activity tracker, the timer and
//! the pending request slot. Everything that touches that state (timer ticks,
//! editor payloads, menu actions, timeouts) arrives as an [`AutosaveCommand`]
//! on a single channel and is handled in order.

use crate::autosave::activity::{ActivitySource, ActivityTracker};
use crate::autosave::bridge::{EditorBridge, EditorMessage};
use crate::autosave::config::AutosaveConfig;
use crate::autosave::error::AutosaveError;
use crate::autosave::host::Host;
use crate::autosave::orchestrator::{Orchestrator, PayloadOutcome, PendingKind};
use crate::autosave::scheduler::AutosaveScheduler;
use crate::autosave::storage::{self, SnapshotStore};
use crate::models::notification::{Notification, NotificationLevel};
use crate::models::status::{AutosaveStatus, SchedulerPhase};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

pub type ExportResult = Result<Option<PathBuf>, AutosaveError>;

#[derive(Debug)]
pub enum AutosaveCommand {
    RegisterActivity(ActivitySource),
    Toggle,
    ManualSave,
    LoadLast,
    ImportRequested,
    Import { file_name: String, bytes: Vec<u8> },
    ImportFailed(AutosaveError),
    Export,
    ExportFinished(ExportResult),
    OpenFolder,
    EditorMessage(EditorMessage),
    Tick(u64),
    RequestTimedOut(u64),
    Reconfigure(AutosaveConfig),
    Status(oneshot::Sender<AutosaveStatus>),
    Shutdown,
}

/// Cheap, cloneable front door to the actor.
#[derive(Debug, Clone)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<AutosaveCommand>,
}

impl AutosaveHandle {
    /// Builds the actor and spawns it on the current tokio runtime.
    pub fn spawn(
        config: AutosaveConfig,
        store: SnapshotStore,
        bridge: Arc<dyn EditorBridge>,
        host: Arc<dyn Host>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (handle, actor) = AutosaveActor::new(config, store, bridge, host);
        (handle, tokio::spawn(actor.run()))
    }

    pub fn register_activity(&self, source: ActivitySource) {
        self.send(AutosaveCommand::RegisterActivity(source));
    }

    pub fn toggle(&self) {
        self.send(AutosaveCommand::Toggle);
    }

    pub fn manual_save(&self) {
        self.send(AutosaveCommand::ManualSave);
    }

    pub fn load_last(&self) {
        self.send(AutosaveCommand::LoadLast);
    }

    /// Shows the import dialog, then opens the chosen file.
    pub fn request_import(&self) {
        self.send(AutosaveCommand::ImportRequested);
    }

    pub fn import(&self, file_name: impl Into<String>, bytes: Vec<u8>) {
        self.send(AutosaveCommand::Import {
            file_name: file_name.into(),
            bytes,
        });
    }

    pub fn export(&self) {
        self.send(AutosaveCommand::Export);
    }

    pub fn open_folder(&self) {
        self.send(AutosaveCommand::OpenFolder);
    }

    pub fn editor_message(&self, message: EditorMessage) {
        self.send(AutosaveCommand::EditorMessage(message));
    }

    pub fn reconfigure(&self, config: AutosaveConfig) {
        self.send(AutosaveCommand::Reconfigure(config));
    }

    pub fn shutdown(&self) {
        self.send(AutosaveCommand::Shutdown);
    }

    /// Resolves after every command sent before it has been handled.
    pub async fn status(&self) -> Result<AutosaveStatus, String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AutosaveCommand::Status(reply))
            .map_err(|_| "Autosave service is not running".to_string())?;
        rx.await
            .map_err(|_| "Autosave service stopped before answering".to_string())
    }

    fn send(&self, command: AutosaveCommand) {
        if self.tx.send(command).is_err() {
            log::warn!("Autosave service is not running, command dropped");
        }
    }
}

pub struct AutosaveActor {
    config: AutosaveConfig,
    tracker: ActivityTracker,
    scheduler: AutosaveScheduler,
    orchestrator: Orchestrator,
    host: Arc<dyn Host>,
    export_dialog_open: bool,
    commands: mpsc::WeakUnboundedSender<AutosaveCommand>,
    rx: mpsc::UnboundedReceiver<AutosaveCommand>,
}

impl AutosaveActor {
    pub fn new(
        config: AutosaveConfig,
        store: SnapshotStore,
        bridge: Arc<dyn EditorBridge>,
        host: Arc<dyn Host>,
    ) -> (AutosaveHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            tracker: ActivityTracker::new(config.activity_debounce),
            scheduler: AutosaveScheduler::new(config.interval),
            orchestrator: Orchestrator::new(store, bridge),
            host,
            export_dialog_open: false,
            commands: tx.downgrade(),
            rx,
            config,
        };
        (AutosaveHandle { tx }, actor)
    }

    pub async fn run(mut self) {
        if let Err(e) = self.orchestrator.store().ensure_dir() {
            log::error!("Could not prepare autosave directory: {}", e);
        }
        log::info!(
            "Autosave service started, snapshots in {}",
            self.orchestrator.store().dir().display()
        );
        self.publish_status();
        self.notify(Notification::info(
            "Autosave is disabled. Turn it on when you are ready.",
        ));

        while let Some(command) = self.rx.recv().await {
            if matches!(command, AutosaveCommand::Shutdown) {
                break;
            }
            self.handle(command);
        }

        self.scheduler.disable();
        self.orchestrator.cancel_pending();
        log::info!("Autosave service stopped");
    }

    fn handle(&mut self, command: AutosaveCommand) {
        match command {
            AutosaveCommand::RegisterActivity(source) => {
                self.tracker.register(source, Instant::now());
            }
            AutosaveCommand::Toggle => self.toggle(),
            AutosaveCommand::ManualSave => {
                self.notify(Notification::info("Manual save started..."));
                self.start_request(PendingKind::Save);
            }
            AutosaveCommand::Tick(generation) => self.on_tick(generation),
            AutosaveCommand::EditorMessage(message) => self.on_editor_message(message),
            AutosaveCommand::RequestTimedOut(id) => self.on_timeout(id),
            AutosaveCommand::Export => self.start_request(PendingKind::Export),
            AutosaveCommand::ExportFinished(result) => self.on_export_finished(result),
            AutosaveCommand::LoadLast => self.load_last(),
            AutosaveCommand::ImportRequested => self.spawn_import_dialog(),
            AutosaveCommand::Import { file_name, bytes } => {
                match self.orchestrator.import(&file_name, &bytes) {
                    Ok(()) => self.notify(Notification::success(format!(
                        "\"{file_name}\" imported as a new document"
                    ))),
                    Err(e) => self.notify(Notification::error(format!("Import failed: {e}"))),
                }
            }
            AutosaveCommand::ImportFailed(e) => {
                self.notify(Notification::error(format!("Import failed: {e}")));
            }
            AutosaveCommand::OpenFolder => self.open_folder(),
            AutosaveCommand::Reconfigure(config) => self.reconfigure(config),
            AutosaveCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
            AutosaveCommand::Shutdown => {}
        }
    }

    fn toggle(&mut self) {
        if self.scheduler.is_enabled() {
            self.scheduler.disable();
            self.notify(Notification::info("Autosave paused"));
        } else {
            let on_tick = self.tick_sender();
            self.scheduler.enable(on_tick);
            self.notify(Notification::success("Autosave enabled"));
        }
        self.publish_status();
    }

    fn on_tick(&mut self, generation: u64) {
        if !self.scheduler.is_current(generation) {
            log::debug!("Dropping tick from a cancelled timer");
            return;
        }
        if self.orchestrator.is_busy() {
            log::debug!("Autosave tick skipped, a request is still in flight");
            return;
        }
        if !self.tracker.is_dirty() {
            log::debug!("No activity since the last save, skipping autosave");
            return;
        }
        log::info!("Activity detected, autosaving");
        self.start_request(PendingKind::Save);
    }

    fn start_request(&mut self, kind: PendingKind) {
        let was_dirty = match kind {
            PendingKind::Save => self.tracker.take_dirty(),
            PendingKind::Export => false,
        };

        let commands = self.commands.clone();
        let result = self.orchestrator.begin(
            kind,
            was_dirty,
            &self.config.blank_document,
            self.config.bridge_timeout,
            move |id| {
                if let Some(tx) = commands.upgrade() {
                    let _ = tx.send(AutosaveCommand::RequestTimedOut(id));
                }
            },
        );

        if let Err(e) = result {
            self.tracker.restore_dirty(was_dirty);
            let notification = match e {
                AutosaveError::SaveInProgress(_) => Notification::warning(e.to_string()),
                _ => Notification::error(format!("Could not start {}: {e}", kind.label())),
            };
            self.notify(notification);
        }
        self.publish_status();
    }

    fn on_editor_message(&mut self, message: EditorMessage) {
        self.tracker
            .register(ActivitySource::EditorMessage, Instant::now());

        match message {
            EditorMessage::Binary(bytes) => self.on_payload(bytes),
            EditorMessage::Text(text) => log::debug!("Editor says: {}", text),
            EditorMessage::Other => log::debug!("Ignoring non-text, non-binary editor message"),
        }
    }

    fn on_payload(&mut self, bytes: Vec<u8>) {
        match self.orchestrator.receive_payload(bytes) {
            PayloadOutcome::Unsolicited => {
                log::warn!("Ignoring editor payload that no request is waiting for");
                return;
            }
            PayloadOutcome::Saved(record) => {
                self.tracker.mark_saved();
                self.notify(Notification::success(format!(
                    "Project saved ({})",
                    record.filename
                )));
            }
            PayloadOutcome::ExportReady(bytes) => self.spawn_export_dialog(bytes),
            PayloadOutcome::Failed {
                kind,
                was_dirty,
                error,
            } => {
                self.tracker.restore_dirty(was_dirty);
                let notification = match error {
                    AutosaveError::EmptyDocument => {
                        Notification::warning(format!("Nothing to {}: {error}", kind.label()))
                    }
                    _ => Notification::error(format!("The {} failed: {error}", kind.label())),
                };
                self.notify(notification);
            }
        }
        self.publish_status();
    }

    fn on_timeout(&mut self, id: u64) {
        let Some(expired) = self.orchestrator.expire(id) else {
            return;
        };
        self.tracker.restore_dirty(expired.was_dirty);
        let error = AutosaveError::BridgeUnresponsive(self.config.bridge_timeout.as_secs());
        self.notify(Notification::error(format!(
            "The {} was abandoned: {error}",
            expired.kind.label()
        )));
        self.publish_status();
    }

    fn spawn_export_dialog(&mut self, bytes: Vec<u8>) {
        let Some(tx) = self.commands.upgrade() else {
            return;
        };
        self.export_dialog_open = true;
        let host = self.host.clone();
        let suggested = format!("project_{}.psd", chrono::Utc::now().timestamp_millis());

        tokio::task::spawn_blocking(move || {
            let result = match host.pick_export_path(&suggested) {
                Some(path) => storage::write_external(&path, &bytes).map(|()| Some(path)),
                None => Ok(None),
            };
            let _ = tx.send(AutosaveCommand::ExportFinished(result));
        });
    }

    fn on_export_finished(&mut self, result: ExportResult) {
        self.export_dialog_open = false;
        match result {
            Ok(Some(path)) => self.notify(Notification::success(format!(
                "Project exported to {}",
                path.display()
            ))),
            Ok(None) => self.notify(Notification::info("Export cancelled")),
            Err(e) => self.notify(Notification::error(format!("Export failed: {e}"))),
        }
        self.publish_status();
    }

    fn load_last(&mut self) {
        let mut loading = self.status();
        loading.phase = SchedulerPhase::Loading;
        loading.message = "Loading last save...".to_string();
        self.host.publish_status(&loading);

        match self.orchestrator.load_last() {
            Ok(record) => self.notify(Notification::success(format!(
                "Save from {} opened as a new document",
                record.display_label()
            ))),
            Err(e) => self.notify(Notification::error(e.to_string())),
        }
        self.publish_status();
    }

    fn spawn_import_dialog(&mut self) {
        let Some(tx) = self.commands.upgrade() else {
            return;
        };
        let host = self.host.clone();

        tokio::task::spawn_blocking(move || {
            let Some(path) = host.pick_import_path() else {
                log::debug!("Import dialog cancelled");
                return;
            };
            let command = match std::fs::read(&path) {
                Ok(bytes) => AutosaveCommand::Import {
                    file_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    bytes,
                },
                Err(e) => AutosaveCommand::ImportFailed(AutosaveError::storage(&path, e)),
            };
            let _ = tx.send(command);
        });
    }

    fn open_folder(&mut self) {
        let result = self
            .orchestrator
            .prepare_folder()
            .map_err(|e| e.to_string())
            .and_then(|dir| self.host.reveal_folder(dir));

        match result {
            Ok(()) => self.notify(Notification::info("Autosave folder opened")),
            Err(e) => self.notify(Notification::error(format!(
                "Could not open the autosave folder: {e}"
            ))),
        }
    }

    fn reconfigure(&mut self, config: AutosaveConfig) {
        self.tracker.set_debounce(config.activity_debounce);
        let on_tick = self.tick_sender();
        self.scheduler.set_period(config.interval, on_tick);
        log::info!(
            "Autosave settings applied (interval {}s, editor timeout {}s)",
            config.interval.as_secs(),
            config.bridge_timeout.as_secs()
        );
        self.config = config;
        self.publish_status();
    }

    fn tick_sender(&self) -> impl FnMut(u64) -> bool + Send + 'static {
        let commands = self.commands.clone();
        move |generation| match commands.upgrade() {
            Some(tx) => tx.send(AutosaveCommand::Tick(generation)).is_ok(),
            None => false,
        }
    }

    fn phase(&self) -> SchedulerPhase {
        match self.orchestrator.pending_kind() {
            Some(PendingKind::Save) => SchedulerPhase::Saving,
            Some(PendingKind::Export) => SchedulerPhase::Exporting,
            None if self.export_dialog_open => SchedulerPhase::Exporting,
            None if self.scheduler.is_enabled() => SchedulerPhase::Idle,
            None => SchedulerPhase::Disabled,
        }
    }

    fn status(&self) -> AutosaveStatus {
        let phase = self.phase();
        let message = match phase {
            SchedulerPhase::Disabled => "Autosave disabled",
            SchedulerPhase::Idle => "Autosave active",
            SchedulerPhase::Saving => "Saving...",
            SchedulerPhase::Exporting => "Exporting...",
            SchedulerPhase::Loading => "Loading last save...",
        };

        AutosaveStatus {
            enabled: self.scheduler.is_enabled(),
            phase,
            dirty: self.tracker.is_dirty(),
            message: message.to_string(),
            last_save: self.orchestrator.last_save(),
            last_successful_save_at: self.orchestrator.last_successful_save(),
            autosave_dir: self.orchestrator.store().dir().to_string_lossy().to_string(),
        }
    }

    fn publish_status(&self) {
        self.host.publish_status(&self.status());
    }

    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => log::error!("{}", notification.message),
            NotificationLevel::Warning => log::warn!("{}", notification.message),
            _ => log::info!("{}", notification.message),
        }
        if self.config.notifications_enabled || notification.is_alert() {
            self.host.notify(&notification);
        }
    }
}
