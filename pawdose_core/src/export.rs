//! CSV export of the dose history.
//!
//! One row per log, oldest scheduled dose first, with pet and medication
//! names resolved so the file reads on its own in a spreadsheet.

use crate::{Household, Result};
use std::collections::HashMap;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    pet: &'a str,
    medication: &'a str,
    scheduled_time: String,
    action_time: String,
    status: String,
}

/// Write every log in `household` to `csv_path`, replacing the file.
///
/// Returns the number of rows written. Logs whose medication is unknown are
/// skipped with a warning.
pub fn logs_to_csv(household: &Household, csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pets: HashMap<_, _> = household.pets.iter().map(|p| (p.id, p.name.as_str())).collect();
    let meds: HashMap<_, _> = household.medications.iter().map(|m| (m.id, m)).collect();

    let mut logs: Vec<_> = household.logs.iter().collect();
    logs.sort_by_key(|l| (l.scheduled_time, l.action_time));

    let mut writer = csv::Writer::from_path(csv_path)?;
    let mut count = 0;
    for log in logs {
        let Some(med) = meds.get(&log.medication_id) else {
            tracing::warn!("Skipping log {} for unknown medication", log.id);
            continue;
        };
        writer.serialize(CsvRow {
            pet: pets.get(&med.pet_id).copied().unwrap_or(""),
            medication: &med.name,
            scheduled_time: log.scheduled_time.format("%Y-%m-%d %H:%M").to_string(),
            action_time: log.action_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: log.status.to_string(),
        })?;
        count += 1;
    }
    writer.flush()?;

    tracing::info!("Exported {} logs to {:?}", count, csv_path);
    Ok(count)
}
