//! Folder Monitor Library
//!
//! Watches one directory and, whenever a file is created in it, archives the
//! whole directory into a timestamped ZIP bundle in a backup directory.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod executor;
pub mod fs;
pub mod utils;
pub mod watch;

// Re-export commonly used types
pub use config::{Config, Targets};
pub use utils::errors::MonitorError;
pub type Result<T> = std::result::Result<T, MonitorError>;
