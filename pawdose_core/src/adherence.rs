//! Adherence aggregation.
//!
//! Folds matched doses and logs into counts and percentages:
//! - Daily and date-range summaries (dose based, includes pending)
//! - Trailing daily trend (log based, by scheduled day)
//! - Per-pet breakdown, worst adherence first
//! - Display lists for remaining, completed and overdue doses
//!
//! Every function here is total: empty input gives zero counts and
//! [`EMPTY_ADHERENCE_PERCENT`].

use crate::{
    doses_between, doses_on, match_doses, DoseStatus, LogStatus, MatchedDose, Medication,
    MedicationLog, Pet,
};
use chrono::{Days, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use uuid::Uuid;

/// Percentage reported when nothing has been taken or missed yet.
///
/// Applied everywhere a ratio has a zero denominator.
pub const EMPTY_ADHERENCE_PERCENT: f64 = 0.0;

/// Longest trailing window [`daily_trend`] will produce.
pub const MAX_TREND_DAYS: u32 = 366;

/// `taken / (taken + missed) * 100`, or [`EMPTY_ADHERENCE_PERCENT`]
pub fn adherence_percent(taken: usize, missed: usize) -> f64 {
    let acted = taken + missed;
    if acted == 0 {
        return EMPTY_ADHERENCE_PERCENT;
    }
    taken as f64 / acted as f64 * 100.0
}

/// Restrict aggregation to one pet, or include all
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PetFilter {
    #[default]
    All,
    Pet(Uuid),
}

impl PetFilter {
    pub fn includes(&self, pet_id: Uuid) -> bool {
        match self {
            PetFilter::All => true,
            PetFilter::Pet(id) => *id == pet_id,
        }
    }
}

impl From<Option<Uuid>> for PetFilter {
    fn from(pet: Option<Uuid>) -> Self {
        pet.map_or(PetFilter::All, PetFilter::Pet)
    }
}

/// Counts for one aggregation window.
///
/// `taken + missed + pending == total` holds for every value built through
/// [`AdherenceCounts::record`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdherenceCounts {
    pub taken: usize,
    pub missed: usize,
    pub pending: usize,
    pub total: usize,
}

impl AdherenceCounts {
    pub fn record(&mut self, status: DoseStatus) {
        match status {
            DoseStatus::Taken => self.taken += 1,
            DoseStatus::Missed => self.missed += 1,
            DoseStatus::Pending => self.pending += 1,
        }
        self.total += 1;
    }

    pub fn percent(&self) -> f64 {
        adherence_percent(self.taken, self.missed)
    }

    /// Count logs directly; there is no pending state without doses.
    pub fn from_logs<'a>(logs: impl IntoIterator<Item = &'a MedicationLog>) -> Self {
        let mut counts = Self::default();
        for log in logs {
            counts.record(log.status.into());
        }
        counts
    }
}

/// Counts over an already matched set.
pub fn summarize(matched: &[MatchedDose<'_>]) -> AdherenceCounts {
    let mut counts = AdherenceCounts::default();
    for m in matched {
        counts.record(m.status());
    }
    counts
}

/// Materialize and match the doses due on `date` for the filtered pets.
pub fn matched_on<'a>(
    date: NaiveDate,
    medications: &'a [Medication],
    logs: &'a [MedicationLog],
    filter: PetFilter,
) -> Vec<MatchedDose<'a>> {
    let doses = doses_on(date, medications)
        .into_iter()
        .filter(|d| filter.includes(d.pet_id()))
        .collect();
    match_doses(doses, logs)
}

/// Dose-based summary for one day.
pub fn summarize_day(
    date: NaiveDate,
    medications: &[Medication],
    logs: &[MedicationLog],
    filter: PetFilter,
) -> AdherenceCounts {
    summarize(&matched_on(date, medications, logs, filter))
}

/// Dose-based summary for every day in `[start, end]`.
pub fn summarize_range(
    start: NaiveDate,
    end: NaiveDate,
    medications: &[Medication],
    logs: &[MedicationLog],
    filter: PetFilter,
) -> AdherenceCounts {
    let doses = doses_between(start, end, medications)
        .into_iter()
        .filter(|d| filter.includes(d.pet_id()))
        .collect();
    summarize(&match_doses(doses, logs))
}

/// One day of a trend window
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyAdherence {
    pub date: NaiveDate,
    pub taken: usize,
    pub missed: usize,
    pub percent: f64,
}

/// Trailing `days`-day trend ending at `end_date`, oldest day first.
///
/// Each day counts only logs whose scheduled time falls on that day, so a
/// dose logged late still lands on the day it was due. The window is
/// clamped to [`MAX_TREND_DAYS`] and stops early at the start of the
/// calendar.
pub fn daily_trend(
    end_date: NaiveDate,
    days: u32,
    medications: &[Medication],
    logs: &[MedicationLog],
    filter: PetFilter,
) -> Vec<DailyAdherence> {
    let owners = owner_index(medications);
    let mut by_day: HashMap<NaiveDate, (usize, usize)> = HashMap::new();
    for log in filtered_logs(logs, &owners, filter) {
        let entry = by_day.entry(log.scheduled_time.date()).or_default();
        match log.status {
            LogStatus::Taken => entry.0 += 1,
            LogStatus::Missed => entry.1 += 1,
        }
    }

    let days = days.min(MAX_TREND_DAYS);
    (0..u64::from(days))
        .rev()
        .filter_map(|back| end_date.checked_sub_days(Days::new(back)))
        .map(|date| {
            let (taken, missed) = by_day.get(&date).copied().unwrap_or_default();
            DailyAdherence {
                date,
                taken,
                missed,
                percent: adherence_percent(taken, missed),
            }
        })
        .collect()
}

/// All-time log-based counts for the filtered pets.
pub fn all_time(
    medications: &[Medication],
    logs: &[MedicationLog],
    filter: PetFilter,
) -> AdherenceCounts {
    let owners = owner_index(medications);
    AdherenceCounts::from_logs(filtered_logs(logs, &owners, filter))
}

/// Adherence for one pet
#[derive(Clone, Debug, PartialEq)]
pub struct PetAdherence {
    pub pet_id: Uuid,
    pub pet_name: String,
    pub taken: usize,
    pub missed: usize,
    pub percent: f64,
}

/// All-time adherence per pet, worst first.
///
/// Pets without logs are included at the default percentage. Ties are
/// ordered by name, then id.
pub fn per_pet_breakdown(
    pets: &[Pet],
    medications: &[Medication],
    logs: &[MedicationLog],
) -> Vec<PetAdherence> {
    let owners = owner_index(medications);
    let mut tallies: HashMap<Uuid, (usize, usize)> = HashMap::new();
    for log in logs {
        let Some(pet_id) = owners.get(&log.medication_id) else {
            continue;
        };
        let entry = tallies.entry(*pet_id).or_default();
        match log.status {
            LogStatus::Taken => entry.0 += 1,
            LogStatus::Missed => entry.1 += 1,
        }
    }

    let mut breakdown: Vec<PetAdherence> = pets
        .iter()
        .map(|pet| {
            let (taken, missed) = tallies.get(&pet.id).copied().unwrap_or_default();
            PetAdherence {
                pet_id: pet.id,
                pet_name: pet.name.clone(),
                taken,
                missed,
                percent: adherence_percent(taken, missed),
            }
        })
        .collect();

    breakdown.sort_by(|a, b| {
        a.percent
            .total_cmp(&b.percent)
            .then_with(|| a.pet_name.cmp(&b.pet_name))
            .then_with(|| a.pet_id.cmp(&b.pet_id))
    });
    breakdown
}

/// Pending doses on `date`, earliest first.
pub fn remaining_on<'a>(
    date: NaiveDate,
    medications: &'a [Medication],
    logs: &'a [MedicationLog],
    filter: PetFilter,
) -> Vec<MatchedDose<'a>> {
    matched_on(date, medications, logs, filter)
        .into_iter()
        .filter(MatchedDose::is_pending)
        .collect()
}

/// Completed doses on `date`, earliest first.
pub fn completed_on<'a>(
    date: NaiveDate,
    medications: &'a [Medication],
    logs: &'a [MedicationLog],
    filter: PetFilter,
) -> Vec<MatchedDose<'a>> {
    matched_on(date, medications, logs, filter)
        .into_iter()
        .filter(MatchedDose::is_completed)
        .collect()
}

/// Today's pending doses whose time has already passed.
pub fn overdue_at<'a>(
    now: NaiveDateTime,
    medications: &'a [Medication],
    logs: &'a [MedicationLog],
    filter: PetFilter,
) -> Vec<MatchedDose<'a>> {
    remaining_on(now.date(), medications, logs, filter)
        .into_iter()
        .filter(|m| m.dose.scheduled_at < now)
        .collect()
}

/// medication id -> owning pet id
fn owner_index(medications: &[Medication]) -> HashMap<Uuid, Uuid> {
    medications.iter().map(|m| (m.id, m.pet_id)).collect()
}

/// Logs whose medication is known and owned by a pet the filter includes
fn filtered_logs<'a>(
    logs: &'a [MedicationLog],
    owners: &'a HashMap<Uuid, Uuid>,
    filter: PetFilter,
) -> impl Iterator<Item = &'a MedicationLog> + 'a {
    logs.iter().filter(move |log| {
        owners
            .get(&log.medication_id)
            .is_some_and(|pet_id| filter.includes(*pet_id))
    })
}
