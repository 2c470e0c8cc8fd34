//! forgebridge core - shared error, configuration and logging infrastructure
//!
//! Everything the forge adapters and the tool server need that is not tied to a
//! particular forge lives here.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
