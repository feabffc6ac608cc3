//! Dose materialization.
//!
//! Expands active medications into concrete, individually addressable dose
//! occurrences for a date. [`resolve_occurrence`] is the one place a
//! reminder time and a date become a timestamp; both this module and the
//! log writer in [`crate::matcher`] go through it, so log lookups compare
//! identical values.

use crate::{is_active, Medication};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use uuid::Uuid;

/// Identity of one occurrence: medication plus resolved timestamp
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoseKey {
    pub medication_id: Uuid,
    pub scheduled_at: NaiveDateTime,
}

/// One due dose, borrowed from its medication. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledDose<'a> {
    pub medication: &'a Medication,
    pub date: NaiveDate,
    pub reminder_time: NaiveTime,
    pub scheduled_at: NaiveDateTime,
}

impl<'a> ScheduledDose<'a> {
    pub fn key(&self) -> DoseKey {
        DoseKey {
            medication_id: self.medication.id,
            scheduled_at: self.scheduled_at,
        }
    }

    pub fn pet_id(&self) -> Uuid {
        self.medication.pet_id
    }
}

/// Combine a calendar date with a reminder's hour and minute.
///
/// Seconds and sub-second precision are always zeroed.
pub fn resolve_occurrence(date: NaiveDate, reminder_time: NaiveTime) -> NaiveDateTime {
    let hour_minute = NaiveTime::from_hms_opt(reminder_time.hour(), reminder_time.minute(), 0)
        .unwrap_or(NaiveTime::MIN);
    date.and_time(hour_minute)
}

/// Materialize every dose due on `date`.
///
/// Sorted by resolved timestamp, then medication id, then reminder time, so
/// repeated calls with the same input return the same order. A medication
/// listing the same clock time twice yields one occurrence.
pub fn doses_on<'a>(date: NaiveDate, medications: &'a [Medication]) -> Vec<ScheduledDose<'a>> {
    let mut doses: Vec<ScheduledDose<'a>> = medications
        .iter()
        .filter(|m| is_active(m, date))
        .flat_map(|m| {
            m.reminder_times.iter().map(move |&time| ScheduledDose {
                medication: m,
                date,
                reminder_time: time,
                scheduled_at: resolve_occurrence(date, time),
            })
        })
        .collect();

    doses.sort_by(|a, b| {
        a.scheduled_at
            .cmp(&b.scheduled_at)
            .then_with(|| a.medication.id.cmp(&b.medication.id))
            .then_with(|| a.reminder_time.cmp(&b.reminder_time))
    });
    doses.dedup_by(|a, b| a.key() == b.key());

    tracing::debug!(%date, count = doses.len(), "Materialized doses");
    doses
}

/// Materialize doses for every day in `[start, end]`, day by day.
///
/// Returns an empty list when `start > end`.
pub fn doses_between<'a>(
    start: NaiveDate,
    end: NaiveDate,
    medications: &'a [Medication],
) -> Vec<ScheduledDose<'a>> {
    let mut doses = Vec::new();
    let mut day = start;
    while day <= end {
        doses.extend(doses_on(day, medications));
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    doses
}
