//! Inactivity tracking
//!
//! The host feeds input events in; the controller asks whether the idle
//! window has elapsed. Time is passed in explicitly so callers and tests
//! control the clock.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Kinds of user input that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerMove,
    KeyPress,
    Click,
    Scroll,
    Touch,
}

/// Tracks the last input activity against a fixed timeout
#[derive(Debug, Clone)]
pub struct IdleTimer {
    timeout: Duration,
    last_activity: DateTime<Utc>,
}

impl IdleTimer {
    /// Start a timer at `now`
    pub fn new(timeout: Duration, now: DateTime<Utc>) -> Self {
        Self {
            timeout,
            last_activity: now,
        }
    }

    /// Reset the idle window
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Time of the most recent activity
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Whether at least `timeout` has passed since the last activity
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (now - self.last_activity).to_std() {
            Ok(elapsed) => elapsed >= self.timeout,
            // Clock went backwards
            Err(_) => false,
        }
    }
}
