//! Core domain types for Pawdose.
//!
//! This module defines the records the engine reads:
//! - Pets and the medications they own
//! - Frequency rules and reminder times
//! - Logs of user actions against individual dose occurrences

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Pets
// ============================================================================

/// A pet owned by the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
}

impl Pet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Map a pet to a slot in a fixed color palette.
///
/// Derived from the pet's id so that renaming a pet keeps its color and two
/// pets sharing a name do not collide by construction.
pub fn pet_palette_index(pet_id: Uuid, palette_len: usize) -> usize {
    if palette_len == 0 {
        return 0;
    }
    (pet_id.as_u128() % palette_len as u128) as usize
}

// ============================================================================
// Frequency Rules
// ============================================================================

/// Which calendar days a medication is due on
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    /// Same weekday as the start date, every week
    Weekly,
    /// Every `every_days` days counted from the start date
    CustomInterval { every_days: u32 },
    /// Tag written by a newer version; never active
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::CustomInterval { every_days } => write!(f, "every {every_days} days"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for Frequency {
    type Err = crate::Error;

    /// Accepts `daily`, `weekly`, or a day count (`3`, `every:3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => {
                let days = other.strip_prefix("every:").unwrap_or(other);
                days.parse::<u32>()
                    .map(|every_days| Self::CustomInterval { every_days })
                    .map_err(|_| crate::Error::Other(format!("unknown frequency: {s}")))
            }
        }
    }
}

// ============================================================================
// Medications
// ============================================================================

/// A recurring dosing rule owned by one pet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medication {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub frequency: Frequency,
    pub reminder_times: Vec<NaiveTime>,
}

impl Medication {
    pub fn new(
        pet_id: Uuid,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: Frequency,
        reminder_times: Vec<NaiveTime>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pet_id,
            name: name.into(),
            dosage: None,
            start_date,
            end_date,
            frequency,
            reminder_times,
        }
    }

    /// Whether the rule can ever produce a dose.
    ///
    /// Misconfigured medications are treated as never active instead of
    /// raising, so one bad record cannot abort a whole day's schedule.
    pub fn is_well_formed(&self) -> bool {
        let frequency_ok = match self.frequency {
            Frequency::Daily | Frequency::Weekly => true,
            Frequency::CustomInterval { every_days } => every_days >= 1,
            Frequency::Unknown => false,
        };
        frequency_ok && !self.reminder_times.is_empty() && self.start_date <= self.end_date
    }
}

// ============================================================================
// Logs
// ============================================================================

/// What the user did about a dose
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Taken,
    Missed,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Taken => write!(f, "taken"),
            Self::Missed => write!(f, "missed"),
        }
    }
}

/// A persisted record that one dose occurrence was acted upon
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: Uuid,
    /// Resolved timestamp of the occurrence this log answers
    pub scheduled_time: NaiveDateTime,
    pub action_time: NaiveDateTime,
    pub status: LogStatus,
}
