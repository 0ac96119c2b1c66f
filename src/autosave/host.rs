use crate::models::notification::Notification;
use crate::models::status::AutosaveStatus;
use std::path::{Path, PathBuf};

/// Window-side collaborators: toasts, the status bar, native dialogs and the
/// platform file manager. Dialog methods block and are only called from the
/// blocking pool.
pub trait Host: Send + Sync + 'static {
    fn notify(&self, notification: &Notification);

    fn publish_status(&self, status: &AutosaveStatus);

    fn pick_export_path(&self, suggested_name: &str) -> Option<PathBuf>;

    fn pick_import_path(&self) -> Option<PathBuf>;

    fn reveal_folder(&self, dir: &Path) -> Result<(), String>;
}
