//! Deadline reminders for a Notion task database.
//!
//! The service keeps an in-memory index of open tasks, retires the ones
//! marked complete, and mails tiered reminders as due dates approach.

pub mod config;
pub mod due;
pub mod error;
pub mod fetcher;
pub mod mail_client;
pub mod notifier;
pub mod notion_client;
pub mod schedule;
pub mod scheduler;
pub mod store;
pub mod sweeper;

pub use error::{ReminderError, ReminderResult};
pub use scheduler::{JobOutcome, ReminderScheduler};
