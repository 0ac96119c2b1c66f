pub mod autosave;
pub mod host;
pub mod menu;
pub mod settings;
