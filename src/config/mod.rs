//! Configuration module for ledgerlock
//!
//! - Local path resolution for the on-device stores
//! - Session tunables persisted as JSON

pub mod paths;
pub mod settings;

pub use paths::LockPaths;
pub use settings::SessionConfig;
