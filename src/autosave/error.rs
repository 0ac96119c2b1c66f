use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutosaveError {
    #[error("Storage error at {path}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No previous autosave found")]
    NoPriorSave,

    #[error("The last save pointer names an unexpected file: {0}")]
    InvalidPointer(String),

    #[error("The editor returned an empty document")]
    EmptyDocument,

    #[error("The editor did not answer within {0} seconds")]
    BridgeUnresponsive(u64),

    #[error("A {0} is already in progress")]
    SaveInProgress(&'static str),

    #[error("Could not reach the editor: {0}")]
    BridgeSend(String),
}

impl AutosaveError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AutosaveError::StorageIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AutosaveError>;
