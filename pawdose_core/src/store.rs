//! Household persistence with file locking.
//!
//! Pets and medications live in `household.json`, written atomically under
//! an exclusive lock. Logs live in the append-only journal (see
//! [`crate::journal`]) and are attached on [`Household::open`].
//!
//! Commands that read the directory and then write it hold a
//! [`DataDirLock`] for the whole cycle, so a journal rewrite and a
//! concurrent append are serialized.

use crate::{Error, Medication, MedicationLog, Pet, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const HOUSEHOLD_FILE: &str = "household.json";
pub const JOURNAL_FILE: &str = "logs.jsonl";
pub const LOCK_FILE: &str = ".pawdose.lock";

/// Advisory lock on a whole data directory, released on drop
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
}

impl DataDirLock {
    /// Block until no other process holds the directory
    pub fn exclusive(data_dir: &Path) -> Result<Self> {
        let file = Self::open_lock_file(data_dir)?;
        file.lock_exclusive()?;
        tracing::trace!("Locked {:?} exclusively", data_dir);
        Ok(Self { file })
    }

    /// Block until no writer holds the directory; other readers may share it
    pub fn shared(data_dir: &Path) -> Result<Self> {
        let file = Self::open_lock_file(data_dir)?;
        file.lock_shared()?;
        Ok(Self { file })
    }

    fn open_lock_file(data_dir: &Path) -> Result<File> {
        std::fs::create_dir_all(data_dir)?;
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(data_dir.join(LOCK_FILE))?)
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release data directory lock: {}", e);
        }
    }
}

/// Everything the engine needs for one query
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Household {
    #[serde(default)]
    pub pets: Vec<Pet>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(skip)]
    pub logs: Vec<MedicationLog>,
}

impl Household {
    /// Load pets, medications and the log journal from a data directory.
    ///
    /// Fails with [`Error::Relink`] if the journal holds a log for a
    /// medication the household file does not know.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let mut household = Self::load(&data_dir.join(HOUSEHOLD_FILE))?;
        household.logs = crate::journal::read_logs(&data_dir.join(JOURNAL_FILE))?;
        household.validate_links()?;
        Ok(household)
    }

    /// Write pets and medications, and rewrite the journal from `self.logs`.
    ///
    /// Used after deletions; plain dose actions append to the journal instead.
    pub fn persist(&self, data_dir: &Path) -> Result<()> {
        self.save(&data_dir.join(HOUSEHOLD_FILE))?;
        crate::journal::rewrite(&data_dir.join(JOURNAL_FILE), &self.logs)
    }

    /// Load the household file with shared locking
    ///
    /// Returns an empty household if the file doesn't exist. Unlike derived
    /// caches, this file holds user-entered records, so a corrupt file is an
    /// error rather than silently replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No household file at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let household: Household = serde_json::from_str(&contents).map_err(|e| {
            Error::Store(format!("Failed to parse household file {:?}: {}", path, e))
        })?;
        household.validate_links()?;

        tracing::debug!(
            pets = household.pets.len(),
            medications = household.medications.len(),
            "Loaded household from {:?}",
            path
        );
        Ok(household)
    }

    /// Save the household file atomically
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("Household path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved household to {:?}", path);
        Ok(())
    }

    /// Open, modify and persist a data directory under its exclusive lock
    pub fn update<F, T>(data_dir: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut Household) -> Result<T>,
    {
        let _lock = DataDirLock::exclusive(data_dir)?;
        let mut household = Self::open(data_dir)?;
        let out = f(&mut household)?;
        household.persist(data_dir)?;
        Ok(out)
    }

    /// Check that every medication has a pet and every log a medication
    pub fn validate_links(&self) -> Result<()> {
        let pet_ids: HashSet<Uuid> = self.pets.iter().map(|p| p.id).collect();
        if let Some(m) = self.medications.iter().find(|m| !pet_ids.contains(&m.pet_id)) {
            return Err(Error::Relink(format!(
                "medication {} ({}) references missing pet {}",
                m.name, m.id, m.pet_id
            )));
        }

        let med_ids: HashSet<Uuid> = self.medications.iter().map(|m| m.id).collect();
        if let Some(log) = self.logs.iter().find(|l| !med_ids.contains(&l.medication_id)) {
            return Err(Error::Relink(format!(
                "log {} references missing medication {}",
                log.id, log.medication_id
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Add a pet; names are unique ignoring case
    pub fn add_pet(&mut self, name: &str) -> Result<Uuid> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Store("Pet name cannot be empty".into()));
        }
        if self.find_pet_by_name(name).is_some() {
            return Err(Error::Store(format!("A pet named {name} already exists")));
        }
        let pet = Pet::new(name);
        let id = pet.id;
        self.pets.push(pet);
        Ok(id)
    }

    pub fn add_medication(&mut self, medication: Medication) -> Result<()> {
        if !self.pets.iter().any(|p| p.id == medication.pet_id) {
            return Err(Error::Relink(format!(
                "Medication {} references missing pet {}",
                medication.name, medication.pet_id
            )));
        }
        self.medications.push(medication);
        Ok(())
    }

    /// Replace a medication by id.
    ///
    /// Returns true when device reminders for it must be resynced.
    pub fn update_medication(&mut self, medication: Medication) -> Result<bool> {
        let slot = self
            .medications
            .iter_mut()
            .find(|m| m.id == medication.id)
            .ok_or_else(|| Error::NotFound(format!("medication {}", medication.id)))?;
        let resync = crate::notify::needs_resync(slot, &medication);
        *slot = medication;
        Ok(resync)
    }

    /// Remove a pet with its medications and their logs.
    ///
    /// Returns the removed medication ids so reminders can be cancelled.
    pub fn remove_pet(&mut self, pet_id: Uuid) -> Result<Vec<Uuid>> {
        let before = self.pets.len();
        self.pets.retain(|p| p.id != pet_id);
        if self.pets.len() == before {
            return Err(Error::NotFound(format!("pet {pet_id}")));
        }

        let removed: Vec<Uuid> = self
            .medications
            .iter()
            .filter(|m| m.pet_id == pet_id)
            .map(|m| m.id)
            .collect();
        self.medications.retain(|m| m.pet_id != pet_id);
        self.logs.retain(|l| !removed.contains(&l.medication_id));

        tracing::info!(pet = %pet_id, medications = removed.len(), "Removed pet");
        Ok(removed)
    }

    /// Remove a medication and its logs
    pub fn remove_medication(&mut self, medication_id: Uuid) -> Result<Medication> {
        let idx = self
            .medications
            .iter()
            .position(|m| m.id == medication_id)
            .ok_or_else(|| Error::NotFound(format!("medication {medication_id}")))?;
        let medication = self.medications.remove(idx);
        self.logs.retain(|l| l.medication_id != medication_id);
        Ok(medication)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn find_pet_by_name(&self, name: &str) -> Option<&Pet> {
        self.pets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn pet(&self, pet_id: Uuid) -> Option<&Pet> {
        self.pets.iter().find(|p| p.id == pet_id)
    }

    /// Find a medication by id, or by name (ignoring case).
    ///
    /// A name shared by several pets' medications is ambiguous unless
    /// `pet_id` narrows it down.
    pub fn find_medication(&self, query: &str, pet_id: Option<Uuid>) -> Result<&Medication> {
        if let Ok(id) = Uuid::parse_str(query) {
            return self
                .medications
                .iter()
                .find(|m| m.id == id)
                .ok_or_else(|| Error::NotFound(format!("medication {id}")));
        }

        let mut matches = self.medications.iter().filter(|m| {
            m.name.eq_ignore_ascii_case(query.trim()) && pet_id.map_or(true, |p| p == m.pet_id)
        });
        match (matches.next(), matches.next()) {
            (Some(m), None) => Ok(m),
            (Some(_), Some(_)) => Err(Error::Store(format!(
                "Several medications are named {query}; pass --pet or the medication id"
            ))),
            (None, _) => Err(Error::NotFound(format!("medication {query}"))),
        }
    }

    pub fn medications_for(&self, pet_id: Uuid) -> impl Iterator<Item = &Medication> {
        self.medications.iter().filter(move |m| m.pet_id == pet_id)
    }
}
