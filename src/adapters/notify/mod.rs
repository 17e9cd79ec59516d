//! Alert delivery adapters. Implement NotifierPort.

pub mod discord;
pub mod log_notifier;

pub use discord::DiscordNotifier;
pub use log_notifier::LogNotifier;
