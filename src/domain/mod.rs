//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod changes;
pub mod entities;
pub mod errors;

pub use changes::{Alert, WatchState};
pub use entities::{
    AccountInfo, Appointment, Assignment, Grade, Message, MessageFolder, OutgoingMail, Person,
    StudyGuide, StudyGuideItem, Subject, find_inbox,
};
pub use errors::DomainError;
