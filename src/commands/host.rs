use crate::autosave::{EditorBridge, Host};
use crate::models::notification::Notification;
use crate::models::status::AutosaveStatus;
use std::path::{Path, PathBuf};
use tauri::{AppHandle, Emitter};
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

pub const EDITOR_COMMAND_EVENT: &str = "editor_command";
pub const NOTIFICATION_EVENT: &str = "notification";
pub const STATUS_EVENT: &str = "autosave_status";

const IMPORT_EXTENSIONS: [&str; 6] = ["psd", "png", "jpg", "jpeg", "webp", "gif"];

/// Bridges the autosave actor to the main window. Editor scripts are emitted
/// to the webview, which relays them to the editor frame with `postMessage`.
pub struct TauriHost {
    app: AppHandle,
}

impl TauriHost {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl EditorBridge for TauriHost {
    fn send(&self, script: &str) -> Result<(), String> {
        self.app
            .emit(EDITOR_COMMAND_EVENT, script)
            .map_err(|e| format!("Emit error: {e}"))
    }
}

impl Host for TauriHost {
    fn notify(&self, notification: &Notification) {
        if let Err(e) = self.app.emit(NOTIFICATION_EVENT, notification) {
            log::warn!("Could not deliver notification: {}", e);
        }
    }

    fn publish_status(&self, status: &AutosaveStatus) {
        if let Err(e) = self.app.emit(STATUS_EVENT, status) {
            log::warn!("Could not publish autosave status: {}", e);
        }
    }

    fn pick_export_path(&self, suggested_name: &str) -> Option<PathBuf> {
        self.app
            .dialog()
            .file()
            .set_title("Export project")
            .set_file_name(suggested_name)
            .add_filter("PSD files", &["psd"])
            .add_filter("All files", &["*"])
            .blocking_save_file()
            .and_then(|path| path.into_path().ok())
    }

    fn pick_import_path(&self) -> Option<PathBuf> {
        self.app
            .dialog()
            .file()
            .set_title("Import project")
            .add_filter("Image files", &IMPORT_EXTENSIONS)
            .add_filter("All files", &["*"])
            .blocking_pick_file()
            .and_then(|path| path.into_path().ok())
    }

    fn reveal_folder(&self, dir: &Path) -> Result<(), String> {
        self.app
            .opener()
            .open_path(dir.to_string_lossy(), None::<&str>)
            .map_err(|e| e.to_string())
    }
}
