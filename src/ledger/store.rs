//! Durable delay ledger.
//!
//! # Responsibilities
//! - Map rate-limit keys to the time of the last admitted forward
//! - Make read-compare-write atomic per key
//! - Persist every change before reporting it
//!
//! # Design Decisions
//! - `DashMap` index; its entry lock serializes writers of one key while
//!   other keys proceed in parallel
//! - Whole-ledger JSON snapshot, replaced atomically (temp file + rename)
//! - Snapshot writes are serialized so an older map state never lands on
//!   disk after a newer one

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SubsecRound, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::ledger::record::LedgerRecord;
use crate::ledger::LedgerError;

/// Rate-limit ledger shared by all request handlers.
#[derive(Debug)]
pub struct DelayLedger {
    entries: DashMap<String, DateTime<Utc>>,
    snapshot_path: Option<PathBuf>,
    flush_lock: Mutex<()>,
}

impl DelayLedger {
    /// A ledger that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            snapshot_path: None,
            flush_lock: Mutex::new(()),
        }
    }

    /// Open the ledger snapshot at `path`, starting empty if it does not
    /// exist yet.
    ///
    /// A new ledger is written out immediately, creating missing parent
    /// directories, so an unwritable location fails here rather than on
    /// the first admission.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let entries = DashMap::new();

        let found = match File::open(&path) {
            Ok(file) => {
                let records: Vec<LedgerRecord> = serde_json::from_reader(BufReader::new(file))?;
                for (index, record) in records.into_iter().enumerate() {
                    let entry = record.decode(index)?;
                    entries.insert(entry.key, entry.last_admitted);
                }
                tracing::info!(path = %path.display(), keys = entries.len(), "Delay ledger loaded");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No delay ledger found, starting empty");
                false
            }
            Err(e) => return Err(LedgerError::Io(e)),
        };

        let ledger = Self {
            entries,
            snapshot_path: Some(path),
            flush_lock: Mutex::new(()),
        };
        if !found {
            if let Some(parent) = ledger.path().and_then(Path::parent) {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            ledger.flush()?;
        }
        Ok(ledger)
    }

    /// Time of the last admitted forward for `key`.
    pub fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|r| *r.value())
    }

    /// Upsert the last admitted time for `key`.
    pub fn record(&self, key: &str, at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.entries.insert(key.to_string(), at.trunc_subsecs(0));
        self.flush()
    }

    /// Atomically read the entry for `key`, ask `admit` whether to proceed,
    /// and if so store `at` as the new last admitted time.
    ///
    /// No other writer for `key` can run between the read and the write.
    /// Returns whether the write happened.
    pub fn record_if<F>(&self, key: &str, at: DateTime<Utc>, admit: F) -> Result<bool, LedgerError>
    where
        F: FnOnce(Option<DateTime<Utc>>) -> bool,
    {
        let at = at.trunc_subsecs(0);
        let admitted = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let ok = admit(Some(*entry.get()));
                if ok {
                    entry.insert(at);
                }
                ok
            }
            Entry::Vacant(entry) => {
                let ok = admit(None);
                if ok {
                    entry.insert(at);
                }
                ok
            }
        };

        if admitted {
            self.flush()?;
        }
        Ok(admitted)
    }

    /// Number of keys recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot file backing this ledger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn flush(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut records: Vec<LedgerRecord> = self
            .entries
            .iter()
            .map(|r| LedgerRecord::encode(r.key(), *r.value()))
            .collect();
        records.sort_by(|a, b| a.origin_machine.cmp(&b.origin_machine));

        let tmp = path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &records)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, path)?;

        tracing::trace!(path = %path.display(), keys = records.len(), "Delay ledger flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_get_and_record() {
        let ledger = DelayLedger::in_memory();
        assert!(ledger.get("DEFAULT").is_none());

        ledger.record("DEFAULT", t0() + TimeDelta::milliseconds(750)).unwrap();
        assert_eq!(ledger.get("DEFAULT"), Some(t0()));

        ledger.record("DEFAULT", t0() + TimeDelta::seconds(4)).unwrap();
        assert_eq!(ledger.get("DEFAULT"), Some(t0() + TimeDelta::seconds(4)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_record_if_declined_leaves_entry() {
        let ledger = DelayLedger::in_memory();
        ledger.record("2001:db8::1", t0()).unwrap();

        let written = ledger
            .record_if("2001:db8::1", t0() + TimeDelta::seconds(1), |last| {
                assert_eq!(last, Some(t0()));
                false
            })
            .unwrap();
        assert!(!written);
        assert_eq!(ledger.get("2001:db8::1"), Some(t0()));
    }

    #[test]
    fn test_record_if_vacant() {
        let ledger = DelayLedger::in_memory();
        let written = ledger
            .record_if("DEFAULT", t0(), |last| last.is_none())
            .unwrap();
        assert!(written);
        assert_eq!(ledger.get("DEFAULT"), Some(t0()));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DELAY_LEDGER.json");

        {
            let ledger = DelayLedger::open(&path).unwrap();
            assert!(ledger.is_empty());
            ledger.record("DEFAULT", t0()).unwrap();
            ledger
                .record_if("2001:db8::1", t0() + TimeDelta::seconds(9), |_| true)
                .unwrap();
        }

        let reopened = DelayLedger::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("DEFAULT"), Some(t0()));
        assert_eq!(reopened.get("2001:db8::1"), Some(t0() + TimeDelta::seconds(9)));
    }

    #[test]
    fn test_snapshot_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let ledger = DelayLedger::open(&path).unwrap();
        ledger.record("DEFAULT", t0()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!([
                {"origin_machine": "DEFAULT", "time_elapsed": "2024-06-01T08:00:00"}
            ])
        );
    }

    #[test]
    fn test_open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("nested").join("DELAY_LEDGER.json");

        let ledger = DelayLedger::open(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");

        assert!(ledger.record_if("DEFAULT", t0(), |_| true).unwrap());
        assert_eq!(DelayLedger::open(&path).unwrap().get("DEFAULT"), Some(t0()));
    }

    #[test]
    fn test_unwritable_location_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let path = blocker.join("DELAY_LEDGER.json");
        assert!(matches!(DelayLedger::open(&path), Err(LedgerError::Io(_))));
    }

    #[test]
    fn test_corrupt_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(DelayLedger::open(&path), Err(LedgerError::Format(_))));

        std::fs::write(
            &path,
            r#"[{"origin_machine": "DEFAULT", "time_elapsed": "2024-06-01T08:00:00"},
                {"origin_machine": "DEFAULT", "time_elapsed": "noon"}]"#,
        )
        .unwrap();
        assert!(matches!(
            DelayLedger::open(&path),
            Err(LedgerError::Corrupt { index: 1, .. })
        ));
    }
}
