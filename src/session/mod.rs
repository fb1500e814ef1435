//! Encryption session
//!
//! - `controller`: the per-user state machine and the encrypt/decrypt contract
//! - `activity`: inactivity tracking for auto-lock

mod activity;
mod controller;

pub use activity::{ActivityKind, IdleTimer};
pub use controller::{FileSessionController, SessionController, SessionState};
