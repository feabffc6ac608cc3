//! Append-only journal of medication logs.
//!
//! Logs are appended to a JSONL (JSON Lines) file with file locking so that
//! concurrent `mark` invocations cannot interleave partial lines.

use crate::{MedicationLog, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Log sink trait for persisting dose actions
pub trait LogSink {
    fn append(&mut self, log: &MedicationLog) -> Result<()>;
}

/// JSONL-based log sink with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LogSink for JsonlJournal {
    fn append(&mut self, log: &MedicationLog) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(log)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended log {} to journal", log.id);
        Ok(())
    }
}

/// Read all logs from a journal file, in append order
pub fn read_logs(path: &Path) -> Result<Vec<MedicationLog>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut logs = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<MedicationLog>(&line) {
            Ok(log) => logs.push(log),
            Err(e) => {
                // A torn final line from a crash must not hide the rest
                tracing::warn!("Failed to parse log at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} logs from journal", logs.len());
    Ok(logs)
}

/// Replace the journal contents atomically
pub fn rewrite(path: &Path, logs: &[MedicationLog]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        for log in logs {
            serde_json::to_writer(&mut writer, log)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| crate::Error::Io(e.error))?;

    tracing::debug!("Rewrote journal with {} logs", logs.len());
    Ok(())
}
