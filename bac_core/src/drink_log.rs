//! JSONL drink log for the command-line front end.
//!
//! Drinks are appended one JSON object per line with file locking. The
//! engine never touches this file; callers read it and pass the result in.

use crate::normalize::normalize_raw;
use crate::{DrinkEvent, RawDrinkEvent, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Destination for newly logged drinks
pub trait DrinkSink {
    fn append(&mut self, drink: &DrinkEvent) -> Result<()>;
}

/// JSONL-backed drink log with file locking
pub struct JsonlDrinkLog {
    path: PathBuf,
}

impl JsonlDrinkLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Read every usable drink, sorted by time
    pub fn read(&self) -> Result<Vec<DrinkEvent>> {
        read_drinks(&self.path)
    }

    /// Delete a drink by id; returns whether it was present
    ///
    /// The log is rewritten in place while holding an exclusive lock, so an
    /// append waiting on the same file lands after the kept lines.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.lock_exclusive()?;

        let mut kept = Vec::new();
        let mut removed = false;
        for line in BufReader::new(&file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let matches = serde_json::from_str::<RawDrinkEvent>(&line)
                .ok()
                .and_then(|raw| raw.id)
                .is_some_and(|line_id| line_id == id);
            if matches {
                removed = true;
            } else {
                // Unparseable lines are kept verbatim for manual recovery
                kept.push(line);
            }
        }

        if removed {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            {
                let mut writer = std::io::BufWriter::new(&file);
                for line in &kept {
                    writeln!(writer, "{}", line)?;
                }
                writer.flush()?;
            }
            file.sync_all()?;
            tracing::info!("Removed drink {} from log", id);
        }

        file.unlock()?;
        Ok(removed)
    }
}

impl DrinkSink for JsonlDrinkLog {
    fn append(&mut self, drink: &DrinkEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(drink)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended drink {} to log", drink.id);
        Ok(())
    }
}

/// Read all usable drinks from a JSONL log
///
/// Missing file means no drinks. Lines that fail to parse or validate are
/// logged and skipped.
pub fn read_drinks(path: &Path) -> Result<Vec<DrinkEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<RawDrinkEvent>(&line) {
            Ok(raw) => records.push(raw),
            Err(e) => {
                tracing::warn!("Failed to parse drink at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;

    let drinks = normalize_raw(records);
    tracing::debug!("Read {} drinks from {:?}", drinks.len(), path);
    Ok(drinks)
}
