pub mod config;
pub mod types;

pub use config::QueueConfig;
pub use types::BackendKind;
