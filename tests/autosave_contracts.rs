use easel_lib::autosave::bridge::{open_document_script, PSD_MIME};
use easel_lib::autosave::{
    ActivitySource, AutosaveConfig, AutosaveHandle, EditorBridge, EditorMessage, Host,
    SnapshotStore,
};
use easel_lib::commands::autosave::{
    editor_message_internal, export_project_internal, forward_window_event,
    load_last_save_internal, manual_save_internal, toggle_autosave_internal,
};
use easel_lib::models::notification::{Notification, NotificationLevel};
use easel_lib::models::save_record::SaveRecord;
use easel_lib::models::status::{AutosaveStatus, SchedulerPhase};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::ipc::InvokeBody;
use tauri::WindowEvent;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PSD_BYTES: &[u8] = b"8BPS\x00\x01layered-document";

struct FakeHost {
    scripts: mpsc::UnboundedSender<String>,
    notifications: mpsc::UnboundedSender<Notification>,
    statuses: Mutex<Vec<AutosaveStatus>>,
    export_path: Mutex<Option<PathBuf>>,
    import_path: Mutex<Option<PathBuf>>,
    revealed: Mutex<Vec<PathBuf>>,
    editor_closed: AtomicBool,
}

impl EditorBridge for FakeHost {
    fn send(&self, script: &str) -> Result<(), String> {
        if self.editor_closed.load(Ordering::SeqCst) {
            return Err("webview is gone".to_string());
        }
        self.scripts
            .send(script.to_string())
            .map_err(|e| e.to_string())
    }
}

impl Host for FakeHost {
    fn notify(&self, notification: &Notification) {
        let _ = self.notifications.send(notification.clone());
    }

    fn publish_status(&self, status: &AutosaveStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn pick_export_path(&self, _suggested_name: &str) -> Option<PathBuf> {
        self.export_path.lock().unwrap().clone()
    }

    fn pick_import_path(&self) -> Option<PathBuf> {
        self.import_path.lock().unwrap().clone()
    }

    fn reveal_folder(&self, dir: &Path) -> Result<(), String> {
        self.revealed.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }
}

struct Harness {
    autosave: AutosaveHandle,
    actor: JoinHandle<()>,
    host: Arc<FakeHost>,
    scripts: mpsc::UnboundedReceiver<String>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    store: SnapshotStore,
    tmp: TempDir,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(AutosaveConfig::default(), |root| root.join("autosaves")).await
    }

    async fn start_with<F>(config: AutosaveConfig, store_dir: F) -> Self
    where
        F: FnOnce(&Path) -> PathBuf,
    {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let store = SnapshotStore::new(store_dir(tmp.path()));
        let (scripts_tx, scripts) = mpsc::unbounded_channel();
        let (notifications_tx, notifications) = mpsc::unbounded_channel();
        let host = Arc::new(FakeHost {
            scripts: scripts_tx,
            notifications: notifications_tx,
            statuses: Mutex::new(Vec::new()),
            export_path: Mutex::new(None),
            import_path: Mutex::new(None),
            revealed: Mutex::new(Vec::new()),
            editor_closed: AtomicBool::new(false),
        });

        let (autosave, actor) =
            AutosaveHandle::spawn(config, store.clone(), host.clone(), host.clone());
        let mut harness = Self {
            autosave,
            actor,
            host,
            scripts,
            notifications,
            store,
            tmp,
        };
        harness.status().await;
        harness.drain_notifications();
        harness
    }

    async fn status(&self) -> AutosaveStatus {
        self.autosave.status().await.expect("autosave status")
    }

    fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            drained.push(notification);
        }
        drained
    }

    fn sent_scripts(&mut self) -> Vec<String> {
        let mut sent = Vec::new();
        while let Ok(script) = self.scripts.try_recv() {
            sent.push(script);
        }
        sent
    }

    async fn next_script(&mut self) -> String {
        self.scripts.recv().await.expect("script sent to editor")
    }

    /// Waits in real time for a notification matching `level`.
    async fn wait_for(&mut self, level: NotificationLevel) -> Notification {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notification = self.notifications.recv().await.expect("notification");
                if notification.level == level {
                    return notification;
                }
            }
        })
        .await
        .expect("notification in time")
    }

    /// Runs one manual save cycle answering with `payload`.
    async fn save_with(&mut self, payload: &[u8]) -> AutosaveStatus {
        self.autosave.manual_save();
        let script = self.next_script().await;
        assert!(script.contains("saveToOE"));
        self.autosave
            .editor_message(EditorMessage::Binary(payload.to_vec()));
        self.status().await
    }
}

#[tokio::test(start_paused = true)]
async fn timer_tick_without_activity_does_not_save() {
    let mut harness = Harness::start().await;

    harness.autosave.toggle();
    assert!(harness.status().await.enabled);
    harness.drain_notifications();

    tokio::time::sleep(Duration::from_secs(181)).await;
    let status = harness.status().await;

    assert_eq!(status.phase, SchedulerPhase::Idle);
    assert!(harness.sent_scripts().is_empty());
    assert!(harness.store.list().expect("list").is_empty());
    assert_eq!(harness.store.read_pointer().expect("pointer"), None);
}

#[tokio::test(start_paused = true)]
async fn timer_tick_with_activity_saves_once_and_moves_pointer() {
    let mut harness = Harness::start().await;

    harness.autosave.toggle();
    harness.autosave.register_activity(ActivitySource::PointerEnter);
    assert!(harness.status().await.dirty);

    tokio::time::sleep(Duration::from_secs(181)).await;
    let script = harness.next_script().await;
    assert!(script.contains("saveToOE(\"psd\")"));
    assert_eq!(harness.status().await.phase, SchedulerPhase::Saving);

    harness
        .autosave
        .editor_message(EditorMessage::Binary(PSD_BYTES.to_vec()));
    let status = harness.status().await;

    let records = harness.store.list().expect("list");
    assert_eq!(records.len(), 1);
    let pointer = harness.store.read_pointer().expect("pointer").expect("pointer set");
    assert_eq!(pointer, records[0].filename);
    assert_eq!(harness.store.read(&pointer).expect("snapshot"), PSD_BYTES);

    assert!(!status.dirty);
    assert_eq!(status.phase, SchedulerPhase::Idle);
    assert_eq!(status.last_save.map(|r| r.filename), Some(pointer));
    assert!(status.last_successful_save_at.is_some());
    assert!(harness.sent_scripts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn activity_at_ten_seconds_is_saved_by_the_three_minute_tick() {
    let mut harness = Harness::start().await;

    harness.autosave.toggle();
    harness.status().await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    harness.autosave.register_activity(ActivitySource::PointerMove);
    harness.status().await;

    tokio::time::sleep(Duration::from_secs(171)).await;
    harness.next_script().await;
    harness
        .autosave
        .editor_message(EditorMessage::Binary(PSD_BYTES.to_vec()));
    harness.status().await;

    let pointer = harness.store.read_pointer().expect("pointer").expect("pointer set");
    assert!(pointer.starts_with("autosave_"));
    assert!(pointer.ends_with(".psd"));
    assert!(SaveRecord::from_filename(&pointer).timestamp.is_some());
    assert_eq!(harness.store.list().expect("list").len(), 1);

    // No new activity, so the next tick is a no-op.
    tokio::time::sleep(Duration::from_secs(180)).await;
    harness.status().await;
    assert!(harness.sent_scripts().is_empty());
    assert_eq!(harness.store.list().expect("list").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn toggling_on_then_off_stops_the_timer() {
    let mut harness = Harness::start().await;

    harness.autosave.toggle();
    harness.autosave.toggle();
    harness.autosave.register_activity(ActivitySource::FocusLost);
    let status = harness.status().await;

    assert!(!status.enabled);
    assert_eq!(status.phase, SchedulerPhase::Disabled);
    assert_eq!(status.message, "Autosave disabled");

    tokio::time::sleep(Duration::from_secs(600)).await;
    harness.status().await;
    assert!(harness.sent_scripts().is_empty());
}

#[tokio::test]
async fn load_without_previous_save_reports_and_skips_editor() {
    let mut harness = Harness::start().await;

    harness.autosave.load_last();
    harness.status().await;

    let notifications = harness.drain_notifications();
    assert!(notifications.iter().any(|n| {
        n.level == NotificationLevel::Error && n.message.contains("No previous autosave found")
    }));
    assert!(harness.sent_scripts().is_empty());
}

#[tokio::test]
async fn saved_payload_is_reopened_as_a_new_document() {
    let mut harness = Harness::start().await;

    harness.save_with(PSD_BYTES).await;
    harness.autosave.load_last();
    let script = harness.next_script().await;

    assert_eq!(script, open_document_script(PSD_MIME, PSD_BYTES));
    assert!(script.ends_with("null, false);"));
    harness.status().await;
    let notifications = harness.drain_notifications();
    assert!(notifications
        .iter()
        .any(|n| n.level == NotificationLevel::Success && n.message.contains("new document")));
}

#[tokio::test]
async fn manual_save_runs_while_autosave_is_disabled() {
    let mut harness = Harness::start().await;
    assert!(!harness.status().await.enabled);

    let status = harness.save_with(PSD_BYTES).await;

    assert!(!status.enabled);
    assert_eq!(status.phase, SchedulerPhase::Disabled);
    assert!(status.last_save.is_some());
    assert_eq!(harness.store.list().expect("list").len(), 1);
}

#[tokio::test]
async fn overlapping_save_requests_are_rejected() {
    let mut harness = Harness::start().await;

    harness.autosave.manual_save();
    harness.autosave.manual_save();
    harness.autosave.export();
    let status = harness.status().await;

    assert_eq!(status.phase, SchedulerPhase::Saving);
    assert_eq!(harness.sent_scripts().len(), 1);
    let warnings: Vec<_> = harness
        .drain_notifications()
        .into_iter()
        .filter(|n| n.level == NotificationLevel::Warning)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].message.contains("already in progress"));
}

#[tokio::test(start_paused = true)]
async fn unanswered_request_times_out_and_frees_the_slot() {
    let config = AutosaveConfig {
        bridge_timeout: Duration::from_secs(30),
        ..AutosaveConfig::default()
    };
    let mut harness = Harness::start_with(config, |root| root.join("autosaves")).await;

    harness.autosave.register_activity(ActivitySource::PointerEnter);
    harness.autosave.manual_save();
    harness.next_script().await;
    let saving = harness.status().await;
    assert_eq!(saving.phase, SchedulerPhase::Saving);
    assert!(!saving.dirty);

    tokio::time::sleep(Duration::from_secs(31)).await;
    let status = harness.status().await;

    assert_eq!(status.phase, SchedulerPhase::Disabled);
    assert!(status.dirty);
    assert!(harness
        .drain_notifications()
        .iter()
        .any(|n| n.level == NotificationLevel::Error && n.message.contains("did not answer")));

    // A payload arriving after the timeout has no owner.
    harness
        .autosave
        .editor_message(EditorMessage::Binary(PSD_BYTES.to_vec()));
    harness.status().await;
    assert!(harness.store.list().expect("list").is_empty());

    // The slot is free again.
    harness.autosave.manual_save();
    harness.next_script().await;
}

#[tokio::test]
async fn empty_payload_warns_and_keeps_previous_pointer() {
    let mut harness = Harness::start().await;
    harness.save_with(PSD_BYTES).await;
    let before = harness.store.read_pointer().expect("pointer");
    harness.drain_notifications();

    let status = harness.save_with(&[]).await;

    assert_eq!(harness.store.read_pointer().expect("pointer"), before);
    assert_eq!(status.phase, SchedulerPhase::Disabled);
    assert!(harness
        .drain_notifications()
        .iter()
        .any(|n| n.level == NotificationLevel::Warning && n.message.contains("empty document")));
}

#[tokio::test]
async fn storage_failure_is_reported_and_keeps_dirty_flag() {
    let mut harness = Harness::start_with(AutosaveConfig::default(), |root| {
        let blocker = root.join("blocker");
        fs::write(&blocker, b"file in the way").expect("write blocker");
        blocker.join("autosaves")
    })
    .await;
    harness.drain_notifications();

    harness.autosave.register_activity(ActivitySource::FocusLost);
    let status = harness.save_with(PSD_BYTES).await;

    assert!(status.dirty);
    assert!(status.last_save.is_none());
    assert!(status.last_successful_save_at.is_none());
    assert!(harness
        .drain_notifications()
        .iter()
        .any(|n| n.level == NotificationLevel::Error && n.message.contains("save failed")));
}

#[tokio::test]
async fn text_messages_count_as_activity_but_do_not_save() {
    let mut harness = Harness::start().await;

    harness
        .autosave
        .editor_message(EditorMessage::Text("done".to_string()));
    harness.autosave.editor_message(EditorMessage::Other);
    let status = harness.status().await;

    assert!(status.dirty);
    assert!(harness.store.list().expect("list").is_empty());
}

#[tokio::test]
async fn export_writes_only_to_the_chosen_path() {
    let mut harness = Harness::start().await;
    let target = harness.tmp.path().join("exported.psd");
    *harness.host.export_path.lock().unwrap() = Some(target.clone());

    harness.autosave.export();
    assert!(harness.next_script().await.contains("saveToOE"));
    assert_eq!(harness.status().await.phase, SchedulerPhase::Exporting);

    harness
        .autosave
        .editor_message(EditorMessage::Binary(PSD_BYTES.to_vec()));
    let done = harness.wait_for(NotificationLevel::Success).await;

    assert!(done.message.contains("exported"));
    assert_eq!(fs::read(&target).expect("exported file"), PSD_BYTES);
    assert_eq!(harness.store.read_pointer().expect("pointer"), None);
    assert!(harness.store.list().expect("list").is_empty());
    assert_eq!(harness.status().await.phase, SchedulerPhase::Disabled);
}

#[tokio::test]
async fn cancelled_export_dialog_restores_status() {
    let mut harness = Harness::start().await;

    harness.autosave.export();
    harness.next_script().await;
    harness
        .autosave
        .editor_message(EditorMessage::Binary(PSD_BYTES.to_vec()));
    let cancelled = harness.wait_for(NotificationLevel::Info).await;

    assert_eq!(cancelled.message, "Export cancelled");
    assert_eq!(harness.status().await.phase, SchedulerPhase::Disabled);
}

#[tokio::test]
async fn import_opens_file_with_extension_mime() {
    let mut harness = Harness::start().await;

    harness.autosave.import("holiday.jpg", vec![0xFF, 0xD8, 0xFF]);
    let script = harness.next_script().await;

    assert_eq!(
        script,
        "app.open(\"data:image/jpeg;base64,/9j/\", null, false);"
    );
    let imported = harness.wait_for(NotificationLevel::Success).await;
    assert!(imported.message.contains("holiday.jpg"));
}

#[tokio::test]
async fn import_dialog_reads_the_chosen_file() {
    let mut harness = Harness::start().await;
    let source = harness.tmp.path().join("layers.psd");
    fs::write(&source, PSD_BYTES).expect("write import source");
    *harness.host.import_path.lock().unwrap() = Some(source);

    harness.autosave.request_import();
    let script = tokio::time::timeout(Duration::from_secs(5), harness.next_script())
        .await
        .expect("import script in time");

    assert_eq!(script, open_document_script(PSD_MIME, PSD_BYTES));
}

#[tokio::test]
async fn open_folder_creates_and_reveals_autosave_directory() {
    let mut harness = Harness::start().await;

    harness.autosave.open_folder();
    harness.status().await;

    let revealed = harness.host.revealed.lock().unwrap().clone();
    assert_eq!(revealed, vec![harness.store.dir().to_path_buf()]);
    assert!(harness.store.dir().is_dir());
    assert!(harness
        .drain_notifications()
        .iter()
        .any(|n| n.message == "Autosave folder opened"));
}

#[tokio::test]
async fn muted_notifications_still_surface_errors() {
    let config = AutosaveConfig {
        notifications_enabled: false,
        ..AutosaveConfig::default()
    };
    let mut harness = Harness::start_with(config, |root| root.join("autosaves")).await;

    harness.save_with(PSD_BYTES).await;
    harness.autosave.load_last();
    harness.status().await;
    assert!(harness.drain_notifications().is_empty());

    fs::remove_file(harness.store.dir().join("last_save.txt")).expect("remove pointer");
    harness.autosave.load_last();
    harness.status().await;
    let notifications = harness.drain_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_timer_and_stops_actor() {
    let harness = Harness::start().await;

    harness.autosave.toggle();
    harness.autosave.register_activity(ActivitySource::PointerEnter);
    harness.status().await;
    harness.autosave.shutdown();

    let Harness { actor, autosave, .. } = harness;
    actor.await.expect("actor exits cleanly");
    assert!(autosave.status().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn shorter_interval_applies_to_running_timer() {
    let mut harness = Harness::start().await;
    harness.autosave.toggle();
    harness.autosave.register_activity(ActivitySource::PointerMove);

    harness.autosave.reconfigure(AutosaveConfig {
        interval: Duration::from_secs(30),
        ..AutosaveConfig::default()
    });
    harness.status().await;

    tokio::time::sleep(Duration::from_secs(31)).await;
    let script = harness.next_script().await;
    assert!(script.contains("saveToOE"));
}

#[tokio::test(start_paused = true)]
async fn tick_during_pending_save_is_skipped_and_keeps_new_activity() {
    let config = AutosaveConfig {
        bridge_timeout: Duration::from_secs(600),
        ..AutosaveConfig::default()
    };
    let mut harness = Harness::start_with(config, |root| root.join("autosaves")).await;

    harness.autosave.toggle();
    harness.autosave.manual_save();
    assert!(harness.next_script().await.contains("saveToOE"));
    harness.autosave.register_activity(ActivitySource::PointerMove);
    assert!(harness.status().await.dirty);

    tokio::time::sleep(Duration::from_secs(181)).await;
    let status = harness.status().await;

    assert!(harness.sent_scripts().is_empty());
    assert!(status.dirty);
    assert_eq!(status.phase, SchedulerPhase::Saving);
}

#[tokio::test]
async fn unreachable_editor_restores_dirty_flag_and_frees_the_slot() {
    let mut harness = Harness::start().await;
    harness.host.editor_closed.store(true, Ordering::SeqCst);

    harness.autosave.toggle();
    harness.autosave.register_activity(ActivitySource::PointerEnter);
    harness.autosave.manual_save();
    let status = harness.status().await;

    assert!(status.dirty);
    assert_eq!(status.phase, SchedulerPhase::Idle);
    assert!(harness.sent_scripts().is_empty());
    assert!(harness.drain_notifications().iter().any(|n| {
        n.level == NotificationLevel::Error && n.message.contains("Could not reach the editor")
    }));

    harness.host.editor_closed.store(false, Ordering::SeqCst);
    harness.autosave.manual_save();
    assert!(harness.next_script().await.contains("saveToOE"));
}

#[tokio::test]
async fn window_focus_loss_registers_activity() {
    let harness = Harness::start().await;

    forward_window_event(&harness.autosave, &WindowEvent::Focused(true));
    assert!(!harness.status().await.dirty);

    forward_window_event(&harness.autosave, &WindowEvent::Focused(false));
    assert!(harness.status().await.dirty);
}

#[tokio::test]
async fn command_bodies_report_status_after_their_action() {
    let mut harness = Harness::start().await;

    let enabled = toggle_autosave_internal(&harness.autosave)
        .await
        .expect("toggle autosave");
    assert!(enabled.enabled);
    assert_eq!(enabled.phase, SchedulerPhase::Idle);

    let saving = manual_save_internal(&harness.autosave)
        .await
        .expect("manual save");
    assert_eq!(saving.phase, SchedulerPhase::Saving);
    harness.next_script().await;

    editor_message_internal(&InvokeBody::Raw(PSD_BYTES.to_vec()), &harness.autosave);
    let saved = harness.status().await;
    assert_eq!(saved.phase, SchedulerPhase::Idle);
    assert!(saved.last_save.is_some());

    let loaded = load_last_save_internal(&harness.autosave)
        .await
        .expect("load last save");
    assert_eq!(loaded.phase, SchedulerPhase::Idle);
    assert_eq!(
        harness.next_script().await,
        open_document_script(PSD_MIME, PSD_BYTES)
    );

    let exporting = export_project_internal(&harness.autosave)
        .await
        .expect("export project");
    assert_eq!(exporting.phase, SchedulerPhase::Exporting);
}
