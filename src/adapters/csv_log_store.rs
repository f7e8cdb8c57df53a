//! CSV-backed post log, one file per day.
//!
//! Daily-cadence sources read only today's file; monthly-cadence sources read
//! the union of every file from the current month. Writes replace today's
//! file with the in-memory set, so concurrent writers would lose updates;
//! runs are strictly sequential.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::domain::error::MacropostError;
use crate::domain::post_log::{PostLog, PostLogEntry};
use crate::domain::source::{LogPeriod, SourceId};
use crate::ports::post_log_port::PostLogStore;

pub struct CsvLogStore {
    dir: PathBuf,
    path: PathBuf,
    log: PostLog,
}

impl CsvLogStore {
    /// Load the log covering `today` at the given cadence.
    pub fn open(dir: &Path, period: LogPeriod, today: NaiveDate) -> Result<Self, MacropostError> {
        let path = dir.join(format!("{}.csv", today.format("%Y-%m-%d")));
        let entries = match period {
            LogPeriod::Daily => read_entries(&path)?,
            LogPeriod::Monthly => read_month(dir, today)?,
        };
        debug!(path = %path.display(), count = entries.len(), "post log loaded");
        Ok(Self {
            dir: dir.to_path_buf(),
            path,
            log: PostLog::new(entries),
        })
    }

    pub fn log(&self) -> &PostLog {
        &self.log
    }

    fn persist(&self) -> Result<(), MacropostError> {
        std::fs::create_dir_all(&self.dir)?;
        let mut writer =
            csv::Writer::from_path(&self.path).map_err(|e| MacropostError::LogStore {
                reason: format!("{}: {e}", self.path.display()),
            })?;
        for entry in self.log.entries() {
            writer
                .serialize(entry)
                .map_err(|e| MacropostError::LogStore {
                    reason: e.to_string(),
                })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl PostLogStore for CsvLogStore {
    fn already_posted(&self, source: SourceId, indicator: &str) -> bool {
        self.log.contains(source, indicator)
    }

    fn record(&mut self, source: SourceId, indicator: &str) -> Result<(), MacropostError> {
        self.log.append(source, indicator);
        self.persist()
    }
}

fn read_entries(path: &Path) -> Result<Vec<PostLogEntry>, MacropostError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| MacropostError::LogStore {
        reason: format!("{}: {e}", path.display()),
    })?;
    let mut entries = Vec::new();
    for record in reader.deserialize() {
        let entry: PostLogEntry = record.map_err(|e| MacropostError::LogStore {
            reason: format!("{}: {e}", path.display()),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Union of every daily file written during `today`'s month.
fn read_month(dir: &Path, today: NaiveDate) -> Result<Vec<PostLogEntry>, MacropostError> {
    let prefix = format!("{}-{:02}-", today.year(), today.month());
    let mut entries = Vec::new();
    let listing = match std::fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
        Err(e) => return Err(e.into()),
    };
    for item in listing {
        let item = item?;
        let name = item.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(&prefix) && name.ends_with(".csv") {
            entries.extend(read_entries(&item.path())?);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn records_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let today = day(2024, 3, 12);

        let mut store = CsvLogStore::open(dir.path(), LogPeriod::Daily, today).unwrap();
        assert!(!store.already_posted(SourceId::Bcb, "IPCA"));
        store.record(SourceId::Bcb, "IPCA").unwrap();

        let reloaded = CsvLogStore::open(dir.path(), LogPeriod::Daily, today).unwrap();
        assert!(reloaded.already_posted(SourceId::Bcb, "IPCA"));
        assert!(!reloaded.already_posted(SourceId::Ibge, "IPCA"));
    }

    #[test]
    fn daily_logs_roll_over_at_midnight() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvLogStore::open(dir.path(), LogPeriod::Daily, day(2024, 3, 12)).unwrap();
        store.record(SourceId::Fgv, "IPC-S").unwrap();

        let tomorrow = CsvLogStore::open(dir.path(), LogPeriod::Daily, day(2024, 3, 13)).unwrap();
        assert!(!tomorrow.already_posted(SourceId::Fgv, "IPC-S"));
    }

    #[test]
    fn monthly_logs_union_the_whole_month() {
        let dir = tempfile::tempdir().unwrap();
        let mut early = CsvLogStore::open(dir.path(), LogPeriod::Monthly, day(2024, 3, 2)).unwrap();
        early.record(SourceId::Ssp, "roubos").unwrap();

        let later = CsvLogStore::open(dir.path(), LogPeriod::Monthly, day(2024, 3, 28)).unwrap();
        assert!(later.already_posted(SourceId::Ssp, "roubos"));

        let next_month =
            CsvLogStore::open(dir.path(), LogPeriod::Monthly, day(2024, 4, 1)).unwrap();
        assert!(!next_month.already_posted(SourceId::Ssp, "roubos"));
    }

    #[test]
    fn empty_directory_is_an_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");
        let store = CsvLogStore::open(&missing, LogPeriod::Monthly, day(2024, 3, 2)).unwrap();
        assert!(store.log().is_empty());
    }

    #[test]
    fn concurrent_writers_last_one_wins() {
        // Both stores load the same (empty) file, so the second write
        // clobbers the first. The sequential runner never hits this.
        let dir = tempfile::tempdir().unwrap();
        let today = day(2024, 3, 12);
        let mut a = CsvLogStore::open(dir.path(), LogPeriod::Daily, today).unwrap();
        let mut b = CsvLogStore::open(dir.path(), LogPeriod::Daily, today).unwrap();

        a.record(SourceId::Bcb, "IPCA").unwrap();
        b.record(SourceId::Bcb, "Focus").unwrap();

        let reloaded = CsvLogStore::open(dir.path(), LogPeriod::Daily, today).unwrap();
        assert!(reloaded.already_posted(SourceId::Bcb, "Focus"));
        assert!(!reloaded.already_posted(SourceId::Bcb, "IPCA"));
    }
}
