/// Database configuration and connection management
pub mod database;

/// Server, upload and token settings loaded from config.toml
pub mod settings;

/// Secrets loaded from environment variables
pub mod secrets;

pub use settings::{AppConfig, load_app_config};
pub use secrets::Secrets;
