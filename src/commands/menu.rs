//! Native menu bar. Every item maps to exactly one autosave action.

use crate::autosave::AutosaveHandle;
use tauri::menu::{Menu, MenuBuilder, MenuItemBuilder, SubmenuBuilder};
use tauri::{AppHandle, Manager, Runtime};

pub mod ids {
    pub const SAVE_NOW: &str = "save_now";
    pub const LOAD_LAST: &str = "load_last";
    pub const OPEN_FOLDER: &str = "open_autosave_folder";
    pub const EXPORT: &str = "export_project";
    pub const IMPORT: &str = "import_project";
    pub const RELOAD: &str = "reload";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    SaveNow,
    LoadLast,
    OpenFolder,
    Export,
    Import,
    Reload,
}

impl MenuAction {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            ids::SAVE_NOW => Some(MenuAction::SaveNow),
            ids::LOAD_LAST => Some(MenuAction::LoadLast),
            ids::OPEN_FOLDER => Some(MenuAction::OpenFolder),
            ids::EXPORT => Some(MenuAction::Export),
            ids::IMPORT => Some(MenuAction::Import),
            ids::RELOAD => Some(MenuAction::Reload),
            _ => None,
        }
    }
}

pub fn build_menu<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<Menu<R>> {
    let save_now = MenuItemBuilder::with_id(ids::SAVE_NOW, "Save now")
        .accelerator("CmdOrCtrl+Shift+S")
        .build(app)?;
    let load_last = MenuItemBuilder::with_id(ids::LOAD_LAST, "Load last save")
        .accelerator("CmdOrCtrl+Shift+O")
        .build(app)?;
    let open_folder =
        MenuItemBuilder::with_id(ids::OPEN_FOLDER, "Open autosave folder").build(app)?;
    let export = MenuItemBuilder::with_id(ids::EXPORT, "Export project...").build(app)?;
    let import = MenuItemBuilder::with_id(ids::IMPORT, "Import project...").build(app)?;
    let reload = MenuItemBuilder::with_id(ids::RELOAD, "Reload")
        .accelerator("CmdOrCtrl+R")
        .build(app)?;

    let file = SubmenuBuilder::new(app, "File")
        .item(&save_now)
        .item(&load_last)
        .separator()
        .item(&open_folder)
        .separator()
        .item(&export)
        .item(&import)
        .separator()
        .quit()
        .build()?;

    let view = SubmenuBuilder::new(app, "View")
        .item(&reload)
        .separator()
        .fullscreen()
        .build()?;

    MenuBuilder::new(app).item(&file).item(&view).build()
}

pub fn handle_menu_event<R: Runtime>(app: &AppHandle<R>, id: &str) {
    let Some(action) = MenuAction::from_id(id) else {
        return;
    };
    log::info!("Menu: {:?}", action);

    if action == MenuAction::Reload {
        if let Some(window) = app.get_webview_window("main") {
            if let Err(e) = window.eval("window.location.reload()") {
                log::warn!("Reload failed: {}", e);
            }
        }
        return;
    }

    match app.try_state::<AutosaveHandle>() {
        Some(autosave) => dispatch(&autosave, action),
        None => log::warn!("Menu action {:?} before autosave service started", action),
    }
}

pub fn dispatch(autosave: &AutosaveHandle, action: MenuAction) {
    match action {
        MenuAction::SaveNow => autosave.manual_save(),
        MenuAction::LoadLast => autosave.load_last(),
        MenuAction::OpenFolder => autosave.open_folder(),
        MenuAction::Export => autosave.export(),
        MenuAction::Import => autosave.request_import(),
        MenuAction::Reload => {}
    }
}
