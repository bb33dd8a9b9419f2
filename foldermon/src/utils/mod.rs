//! Utility modules for the folder monitor.

pub mod errors;
pub mod logger;

pub use errors::{MonitorError, Result};
