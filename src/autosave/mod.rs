pub mod activity;
pub mod actor;
pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod scheduler;
pub mod storage;

pub use activity::ActivitySource;
pub use actor::{AutosaveActor, AutosaveHandle};
pub use bridge::{EditorBridge, EditorMessage};
pub use config::AutosaveConfig;
pub use error::AutosaveError;
pub use host::Host;
pub use storage::SnapshotStore;
