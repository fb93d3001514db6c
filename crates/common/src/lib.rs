pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, KNOWN_PROVIDERS};
pub use error::ClipsightError;

pub type Result<T> = std::result::Result<T, ClipsightError>;
