//! Dose identity and log matching.
//!
//! A dose and a log refer to the same occurrence when their
//! `(medication id, scheduled timestamp)` pairs are exactly equal. The write
//! path below builds logs through [`resolve_occurrence`] so that equality
//! holds.

use crate::{resolve_occurrence, LogStatus, Medication, MedicationLog, ScheduledDose};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

/// Status of one occurrence after matching against the log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DoseStatus {
    Pending,
    Taken,
    Missed,
}

impl From<LogStatus> for DoseStatus {
    fn from(status: LogStatus) -> Self {
        match status {
            LogStatus::Taken => DoseStatus::Taken,
            LogStatus::Missed => DoseStatus::Missed,
        }
    }
}

/// A dose paired with the log that answers it, if any
#[derive(Clone, Copy, Debug)]
pub struct MatchedDose<'a> {
    pub dose: ScheduledDose<'a>,
    pub log: Option<&'a MedicationLog>,
}

impl<'a> MatchedDose<'a> {
    pub fn status(&self) -> DoseStatus {
        self.log.map_or(DoseStatus::Pending, |log| log.status.into())
    }

    pub fn is_pending(&self) -> bool {
        self.log.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.log.is_some()
    }
}

/// Find the log for `dose`.
///
/// Returns the first log in `logs` with the dose's exact identity key.
/// Later duplicates are ignored; deduplication belongs to storage.
pub fn log_for<'a>(dose: &ScheduledDose<'_>, logs: &'a [MedicationLog]) -> Option<&'a MedicationLog> {
    logs.iter().find(|log| {
        log.medication_id == dose.medication.id && log.scheduled_time == dose.scheduled_at
    })
}

/// Pair every dose with its log, preserving dose order.
pub fn match_doses<'a>(
    doses: Vec<ScheduledDose<'a>>,
    logs: &'a [MedicationLog],
) -> Vec<MatchedDose<'a>> {
    doses
        .into_iter()
        .map(|dose| {
            let log = log_for(&dose, logs);
            MatchedDose { dose, log }
        })
        .collect()
}

/// Build the log for a user's "taken"/"missed" action on `dose`.
pub fn record_action(
    dose: &ScheduledDose<'_>,
    status: LogStatus,
    action_time: NaiveDateTime,
) -> MedicationLog {
    log_for_reminder(dose.medication, dose.date, dose.reminder_time, status, action_time)
}

/// Build a log from a medication, date and reminder time without
/// materializing the dose first.
pub fn log_for_reminder(
    medication: &Medication,
    date: NaiveDate,
    reminder_time: NaiveTime,
    status: LogStatus,
    action_time: NaiveDateTime,
) -> MedicationLog {
    let log = MedicationLog {
        id: Uuid::new_v4(),
        medication_id: medication.id,
        scheduled_time: resolve_occurrence(date, reminder_time),
        action_time,
        status,
    };
    tracing::debug!(
        medication = %medication.id,
        scheduled = %log.scheduled_time,
        status = %status,
        "Recorded dose action"
    );
    log
}
