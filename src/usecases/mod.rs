//! Application use cases. Orchestrate domain logic via ports.

pub mod auth_service;
pub mod dump_service;
pub mod mail_service;
pub mod overview_service;
pub mod watcher_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_service::{AuthService, Credentials};
pub use dump_service::{DumpReport, DumpService};
pub use mail_service::MailService;
pub use overview_service::{InboxSummary, Overview, OverviewService};
pub use watcher_service::{CycleOutcome, WatcherService};
