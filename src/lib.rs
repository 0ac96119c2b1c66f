pub mod autosave;
pub mod commands;
pub mod models;

use autosave::{AutosaveActor, AutosaveHandle, SnapshotStore};
use commands::{
    autosave::{
        editor_message, export_project, forward_window_event, get_autosave_status,
        import_project, load_last_save, manual_save, open_autosave_folder, register_activity,
        toggle_autosave,
    },
    host::TauriHost,
    menu::{build_menu, handle_menu_event},
    settings::{config_dir, get_settings, load_autosave_config, save_settings},
};
use std::sync::Arc;
use tauri::Manager;

pub const AUTOSAVE_DIR_NAME: &str = "autosaves";

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .menu(build_menu)
        .on_menu_event(|app, event| handle_menu_event(app, event.id().as_ref()))
        .setup(|app| {
            let handle = app.handle().clone();
            let config = load_autosave_config(&config_dir(&handle)?);
            let store = SnapshotStore::new(app.path().app_data_dir()?.join(AUTOSAVE_DIR_NAME));
            let host = Arc::new(TauriHost::new(handle));

            let (autosave, actor) = AutosaveActor::new(config, store, host.clone(), host);
            tauri::async_runtime::spawn(actor.run());
            app.manage(autosave);
            Ok(())
        })
        .on_window_event(|window, event| {
            if let Some(autosave) = window.try_state::<AutosaveHandle>() {
                forward_window_event(&autosave, event);
            }
        })
        .invoke_handler(tauri::generate_handler![
            get_autosave_status,
            toggle_autosave,
            manual_save,
            load_last_save,
            export_project,
            import_project,
            open_autosave_folder,
            register_activity,
            editor_message,
            get_settings,
            save_settings,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| {
            if let tauri::RunEvent::Exit = event {
                if let Some(autosave) = app.try_state::<AutosaveHandle>() {
                    autosave.shutdown();
                }
            }
        });
}
