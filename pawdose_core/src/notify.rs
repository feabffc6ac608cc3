//! Reminder planning for the notification layer.
//!
//! The engine never talks to the OS. It describes which reminders should
//! exist for a medication; a [`ReminderSink`] implementation turns those
//! into platform alarms. Settings are passed in explicitly on every call.
//!
//! [`RecordingSink`] is the sink the CLI uses: it keeps the scheduled set in
//! `reminders.json` next to the household so later runs can list it.

use crate::{Error, Medication, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const REMINDERS_FILE: &str = "reminders.json";

/// Delivery options for device reminders
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationSettings {
    #[serde(default = "default_sound")]
    pub sound: bool,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sound: default_sound(),
            snooze_minutes: default_snooze_minutes(),
        }
    }
}

fn default_sound() -> bool {
    true
}

fn default_snooze_minutes() -> u32 {
    10
}

/// One repeating device reminder
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderRequest {
    pub medication_id: Uuid,
    pub time: NaiveTime,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub sound: bool,
    pub snooze_minutes: u32,
}

/// Platform side of reminder delivery
pub trait ReminderSink {
    /// Drop every reminder previously scheduled for this medication
    fn cancel(&mut self, medication_id: Uuid);
    fn schedule(&mut self, request: ReminderRequest);
}

/// Reminders a medication needs, one per distinct hour:minute.
///
/// Malformed medications get no reminders, mirroring the scheduler.
pub fn plan_reminders(
    medication: &Medication,
    settings: &NotificationSettings,
) -> Vec<ReminderRequest> {
    if !medication.is_well_formed() {
        return Vec::new();
    }

    let times: BTreeSet<(u32, u32)> = medication
        .reminder_times
        .iter()
        .map(|t| (t.hour(), t.minute()))
        .collect();

    times
        .into_iter()
        .filter_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
        .map(|time| ReminderRequest {
            medication_id: medication.id,
            time,
            first_date: medication.start_date,
            last_date: medication.end_date,
            sound: settings.sound,
            snooze_minutes: settings.snooze_minutes,
        })
        .collect()
}

/// Whether an edit changed anything device reminders depend on
pub fn needs_resync(before: &Medication, after: &Medication) -> bool {
    before.reminder_times != after.reminder_times
        || before.start_date != after.start_date
        || before.end_date != after.end_date
        || before.frequency != after.frequency
}

/// Cancel and reschedule all reminders for `medication`.
pub fn resync(
    sink: &mut dyn ReminderSink,
    medication: &Medication,
    settings: &NotificationSettings,
) -> usize {
    sink.cancel(medication.id);
    let plan = plan_reminders(medication, settings);
    let count = plan.len();
    for request in plan {
        sink.schedule(request);
    }
    tracing::debug!(medication = %medication.id, count, "Resynced reminders");
    count
}

/// Sink that keeps the currently scheduled reminders
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecordingSink {
    #[serde(default)]
    pub scheduled: Vec<ReminderRequest>,
    /// Cancellations made since this sink was loaded
    #[serde(skip)]
    pub cancelled: Vec<Uuid>,
}

impl RecordingSink {
    /// Load the scheduled set, or an empty sink if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Store(format!("Failed to parse reminders file {:?}: {}", path, e))
        })
    }

    /// Write the scheduled set atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("Reminders path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(count = self.scheduled.len(), "Saved reminders to {:?}", path);
        Ok(())
    }

    /// Scheduled reminders for one medication, earliest time first
    pub fn for_medication(&self, medication_id: Uuid) -> Vec<&ReminderRequest> {
        let mut requests: Vec<_> = self
            .scheduled
            .iter()
            .filter(|r| r.medication_id == medication_id)
            .collect();
        requests.sort_by_key(|r| r.time);
        requests
    }
}

impl ReminderSink for RecordingSink {
    fn cancel(&mut self, medication_id: Uuid) {
        self.scheduled.retain(|r| r.medication_id != medication_id);
        self.cancelled.push(medication_id);
    }

    fn schedule(&mut self, request: ReminderRequest) {
        self.scheduled.push(request);
    }
}
