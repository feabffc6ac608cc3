//! Recurrence evaluation: is a medication due on a given calendar day?
//!
//! Dates are `NaiveDate`, so there is no time-of-day to strip before
//! comparing. Every rule fails closed.

use crate::{Frequency, Medication};
use chrono::{Datelike, NaiveDate};

/// Decide whether `medication` has doses due on `target`.
///
/// Rules:
/// 1. `target` must lie within `[start_date, end_date]` (inclusive)
/// 2. `Daily` is active on every day in range
/// 3. `Weekly` is active when the weekday matches the start date's weekday
/// 4. `CustomInterval(n)` is active when the day offset from the start is a
///    non-negative multiple of `n`
/// 5. Unknown tags and malformed medications are never active
pub fn is_active(medication: &Medication, target: NaiveDate) -> bool {
    if !medication.is_well_formed() {
        tracing::trace!(medication = %medication.id, "Medication is malformed, treating as inactive");
        return false;
    }

    if target < medication.start_date || target > medication.end_date {
        return false;
    }

    match medication.frequency {
        Frequency::Daily => true,
        Frequency::Weekly => target.weekday() == medication.start_date.weekday(),
        Frequency::CustomInterval { every_days } => {
            interval_matches(medication.start_date, target, every_days)
        }
        Frequency::Unknown => false,
    }
}

/// Day-offset test for custom intervals.
///
/// The offset is checked for sign before taking the remainder: `%` on a
/// negative `i64` yields a negative or zero remainder, and a zero remainder
/// would mark pre-start days as due.
fn interval_matches(start: NaiveDate, target: NaiveDate, every_days: u32) -> bool {
    if every_days == 0 {
        return false;
    }
    let offset = (target - start).num_days();
    offset >= 0 && offset % i64::from(every_days) == 0
}
