#![forbid(unsafe_code)]

//! Core domain model and scheduling logic for Pawdose.
//!
//! This crate provides:
//! - Domain types (pets, medications, frequency rules, logs)
//! - Recurrence evaluation and dose materialization
//! - Log matching and adherence aggregation
//! - File-based collaborators (household store, log journal, backup, CSV export)
//! - Reminder planning for the notification layer

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod recurrence;
pub mod schedule;
pub mod matcher;
pub mod adherence;
pub mod notify;
pub mod store;
pub mod journal;
pub mod backup;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use recurrence::is_active;
pub use schedule::{doses_between, doses_on, resolve_occurrence, DoseKey, ScheduledDose};
pub use matcher::{log_for, match_doses, record_action, DoseStatus, MatchedDose};
pub use adherence::{
    adherence_percent, AdherenceCounts, DailyAdherence, PetAdherence, PetFilter,
    EMPTY_ADHERENCE_PERCENT, MAX_TREND_DAYS,
};
pub use notify::{NotificationSettings, RecordingSink, ReminderRequest, ReminderSink};
pub use store::{DataDirLock, Household};
pub use journal::{JsonlJournal, LogSink};
