//! Infrastructure adapters. Implement outbound ports.
//!
//! Magister HTTP API and login, Discord, filesystem, terminal UI. Map errors to DomainError.

pub mod magister;
pub mod notify;
pub mod persistence;
pub mod ui;

use std::time::Duration;

/// Connect timeout for a client with the given request timeout, capped at 10 s.
pub(crate) fn connect_timeout(timeout: Duration) -> Duration {
    timeout.min(Duration::from_secs(10))
}
