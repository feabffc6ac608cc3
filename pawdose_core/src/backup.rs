//! Tree-shaped backup of a household.
//!
//! The backup nests pets, medications and logs so that ownership is carried
//! by structure instead of id fields. Restoring relinks the back-references
//! from that nesting before anything reaches the scheduler.

use crate::{Frequency, Household, LogStatus, Medication, MedicationLog, Pet, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub const BACKUP_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BackupTree {
    pub version: u32,
    pub pets: Vec<PetNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PetNode {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub medications: Vec<MedicationNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicationNode {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub frequency: Frequency,
    pub reminder_times: Vec<NaiveTime>,
    #[serde(default)]
    pub logs: Vec<LogNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogNode {
    pub id: Uuid,
    pub scheduled_time: NaiveDateTime,
    pub action_time: NaiveDateTime,
    pub status: LogStatus,
}

impl BackupTree {
    pub fn from_household(household: &Household) -> Self {
        let pets = household
            .pets
            .iter()
            .map(|pet| PetNode {
                id: pet.id,
                name: pet.name.clone(),
                medications: household
                    .medications_for(pet.id)
                    .map(|m| MedicationNode {
                        id: m.id,
                        name: m.name.clone(),
                        dosage: m.dosage.clone(),
                        start_date: m.start_date,
                        end_date: m.end_date,
                        frequency: m.frequency,
                        reminder_times: m.reminder_times.clone(),
                        logs: household
                            .logs
                            .iter()
                            .filter(|l| l.medication_id == m.id)
                            .map(|l| LogNode {
                                id: l.id,
                                scheduled_time: l.scheduled_time,
                                action_time: l.action_time,
                                status: l.status,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            version: BACKUP_VERSION,
            pets,
        }
    }

    /// Flatten into a household, relinking `pet_id` and `medication_id`
    /// from the nesting.
    pub fn into_household(self) -> Result<Household> {
        let mut household = Household::default();
        for pet in self.pets {
            household.pets.push(Pet {
                id: pet.id,
                name: pet.name,
            });
            for med in pet.medications {
                household.logs.extend(med.logs.into_iter().map(|l| MedicationLog {
                    id: l.id,
                    medication_id: med.id,
                    scheduled_time: l.scheduled_time,
                    action_time: l.action_time,
                    status: l.status,
                }));
                household.medications.push(Medication {
                    id: med.id,
                    pet_id: pet.id,
                    name: med.name,
                    dosage: med.dosage,
                    start_date: med.start_date,
                    end_date: med.end_date,
                    frequency: med.frequency,
                    reminder_times: med.reminder_times,
                });
            }
        }
        household.validate_links()?;
        Ok(household)
    }
}

/// Write a household backup as pretty JSON
pub fn write(household: &Household, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tree = BackupTree::from_household(household);
    std::fs::write(path, serde_json::to_string_pretty(&tree)?)?;
    tracing::info!(pets = tree.pets.len(), "Wrote backup to {:?}", path);
    Ok(())
}

/// Read a backup and relink it into a household
pub fn read(path: &Path) -> Result<Household> {
    let contents = std::fs::read_to_string(path)?;
    let tree: BackupTree = serde_json::from_str(&contents)?;
    if tree.version > BACKUP_VERSION {
        tracing::warn!(
            "Backup version {} is newer than supported {}; unknown fields are ignored",
            tree.version,
            BACKUP_VERSION
        );
    }
    tree.into_household()
}
