use crate::autosave::{ActivitySource, AutosaveHandle, EditorMessage};
use crate::models::status::AutosaveStatus;
use tauri::ipc::{InvokeBody, Request};
use tauri::{State, WindowEvent};

#[tauri::command]
pub async fn get_autosave_status(
    autosave: State<'_, AutosaveHandle>,
) -> Result<AutosaveStatus, String> {
    autosave.status().await
}

#[tauri::command]
pub async fn toggle_autosave(
    autosave: State<'_, AutosaveHandle>,
) -> Result<AutosaveStatus, String> {
    toggle_autosave_internal(autosave.inner()).await
}

pub async fn toggle_autosave_internal(
    autosave: &AutosaveHandle,
) -> Result<AutosaveStatus, String> {
    autosave.toggle();
    autosave.status().await
}

#[tauri::command]
pub async fn manual_save(autosave: State<'_, AutosaveHandle>) -> Result<AutosaveStatus, String> {
    manual_save_internal(autosave.inner()).await
}

pub async fn manual_save_internal(autosave: &AutosaveHandle) -> Result<AutosaveStatus, String> {
    autosave.manual_save();
    autosave.status().await
}

#[tauri::command]
pub async fn load_last_save(
    autosave: State<'_, AutosaveHandle>,
) -> Result<AutosaveStatus, String> {
    load_last_save_internal(autosave.inner()).await
}

pub async fn load_last_save_internal(
    autosave: &AutosaveHandle,
) -> Result<AutosaveStatus, String> {
    autosave.load_last();
    autosave.status().await
}

#[tauri::command]
pub async fn export_project(
    autosave: State<'_, AutosaveHandle>,
) -> Result<AutosaveStatus, String> {
    export_project_internal(autosave.inner()).await
}

pub async fn export_project_internal(
    autosave: &AutosaveHandle,
) -> Result<AutosaveStatus, String> {
    autosave.export();
    autosave.status().await
}

#[tauri::command]
pub fn import_project(autosave: State<'_, AutosaveHandle>) {
    autosave.request_import();
}

#[tauri::command]
pub fn open_autosave_folder(autosave: State<'_, AutosaveHandle>) {
    autosave.open_folder();
}

#[tauri::command]
pub fn register_activity(source: ActivitySource, autosave: State<'_, AutosaveHandle>) {
    autosave.register_activity(source);
}

/// Inbound editor traffic. Binary payloads arrive as raw IPC bodies, text as
/// `{ "text": ... }`.
#[tauri::command]
pub fn editor_message(request: Request<'_>, autosave: State<'_, AutosaveHandle>) {
    editor_message_internal(request.body(), autosave.inner());
}

pub fn editor_message_internal(body: &InvokeBody, autosave: &AutosaveHandle) {
    let message = EditorMessage::from_invoke_body(body);
    log::debug!("Editor message: {}", message.kind());
    autosave.editor_message(message);
}

/// The main window losing focus counts as user activity.
pub fn activity_for_window_event(event: &WindowEvent) -> Option<ActivitySource> {
    match event {
        WindowEvent::Focused(false) => Some(ActivitySource::FocusLost),
        _ => None,
    }
}

pub fn forward_window_event(autosave: &AutosaveHandle, event: &WindowEvent) {
    if let Some(source) = activity_for_window_event(event) {
        autosave.register_activity(source);
    }
}
