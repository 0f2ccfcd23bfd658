//! JSONL journal store - append-only writer
//!
//! Each append is synced before returning, so a record that was
//! acknowledged survives a crash. An exclusive lock on `journal.lock` is
//! held for the lifetime of a file-backed store: one writer per directory.

use crate::error::JournalError;
use crate::hash::{verify_chain, GENESIS_HASH};
use crate::reader::JournalReader;
use crate::record::{JournalRecord, StateChange};
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the journal inside a data directory
pub const JOURNAL_FILE: &str = "journal.jsonl";

/// File name of the writer lock inside a data directory
pub const LOCK_FILE: &str = "journal.lock";

enum Backend {
    File {
        path: PathBuf,
        file: File,
        // Released when the store is dropped
        _lock: File,
    },
    Memory {
        records: Vec<JournalRecord>,
    },
}

/// Append-only journal, on disk or in memory
pub struct JournalStore {
    backend: Backend,
    last_sequence: u64,
    last_hash: String,
    append_budget: Option<usize>,
}

impl JournalStore {
    /// Open the journal in `dir`, verifying the existing chain.
    ///
    /// Returns the store positioned after the last record, together with
    /// every existing record for replay. A torn final line left by a crash
    /// mid-append is cut off; corruption anywhere else is an error.
    pub fn open(dir: impl AsRef<Path>) -> Result<(Self, Vec<JournalRecord>), JournalError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let lock = acquire_lock(dir)?;
        let path = dir.join(JOURNAL_FILE);

        let scan = JournalReader::open(&path).scan()?;
        verify_chain(&scan.records)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        if let Some(bytes) = scan.torn_tail {
            tracing::warn!(
                path = %path.display(),
                bytes,
                valid_len = scan.valid_len,
                "Truncating torn journal tail"
            );
            file.set_len(scan.valid_len)?;
            file.sync_data()?;
        }

        let records = scan.records;
        let (last_sequence, last_hash) = match records.last() {
            Some(last) => (last.sequence, last.hash.clone()),
            None => (0, GENESIS_HASH.to_string()),
        };

        tracing::debug!(path = %path.display(), records = records.len(), "Journal opened");

        let store = Self {
            backend: Backend::File {
                path,
                file,
                _lock: lock,
            },
            last_sequence,
            last_hash,
            append_budget: None,
        };
        Ok((store, records))
    }

    /// Create a fresh journal in `dir`; fails if one already has records.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, JournalError> {
        let (store, records) = Self::open(dir)?;
        if !records.is_empty() {
            return Err(JournalError::AlreadyExists(store.path().to_path_buf()));
        }
        Ok(store)
    }

    /// Journal kept in memory only (tests, ephemeral engines)
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory {
                records: Vec::new(),
            },
            last_sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
            append_budget: None,
        }
    }

    /// Let `remaining` more appends succeed, then fail every later one with
    /// an I/O error. `None` lifts the limit.
    pub fn limit_appends(&mut self, remaining: Option<usize>) {
        self.append_budget = remaining;
    }

    /// Append a change, returning the sealed record
    pub fn append(&mut self, change: StateChange) -> Result<JournalRecord, JournalError> {
        if let Some(remaining) = self.append_budget.as_mut() {
            if *remaining == 0 {
                return Err(io::Error::other("journal append limit reached").into());
            }
            *remaining -= 1;
        }

        let record = JournalRecord::seal(
            self.last_sequence + 1,
            self.last_hash.clone(),
            Utc::now(),
            change,
        )?;

        match &mut self.backend {
            Backend::File { file, .. } => {
                let mut line = serde_json::to_string(&record)?;
                line.push('\n');
                append_or_rewind(file, line.as_bytes(), write_synced)?;
            }
            Backend::Memory { records } => {
                records.push(record.clone());
            }
        }

        self.last_sequence = record.sequence;
        self.last_hash = record.hash.clone();
        Ok(record)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    /// Path of the journal file (empty for in-memory journals)
    pub fn path(&self) -> &Path {
        match &self.backend {
            Backend::File { path, .. } => path,
            Backend::Memory { .. } => Path::new(""),
        }
    }
}

fn acquire_lock(dir: &Path) -> Result<File, JournalError> {
    let path = dir.join(LOCK_FILE);
    let lock = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)?;

    match fs2::FileExt::try_lock_exclusive(&lock) {
        Ok(()) => Ok(lock),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(JournalError::Locked(path)),
        Err(e) => Err(e.into()),
    }
}

fn write_synced(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_data()
}

/// Run `write`, cutting the file back to its previous length if it fails,
/// so a partial line never sits in front of the next record.
fn append_or_rewind<F>(file: &mut File, bytes: &[u8], write: F) -> io::Result<()>
where
    F: FnOnce(&mut File, &[u8]) -> io::Result<()>,
{
    let len = file.metadata()?.len();
    if let Err(err) = write(file, bytes) {
        if let Err(rewind) = file.set_len(len) {
            tracing::error!(error = %rewind, len, "Could not rewind journal after failed append");
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_chain() {
        let mut store = JournalStore::in_memory();
        let first = store.append(StateChange::ThresholdSet { threshold: 1 }).unwrap();
        let second = store.append(StateChange::ThresholdSet { threshold: 2 }).unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(first.prev_hash, GENESIS_HASH);
        assert_eq!(second.prev_hash, first.hash);
        assert_eq!(store.last_sequence(), 2);
        assert!(verify_chain(&[first, second]).is_ok());
    }

    #[test]
    fn test_reopen_resumes_chain() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = JournalStore::create(dir.path()).unwrap();
            store.append(StateChange::ThresholdSet { threshold: 1 }).unwrap();
            store.append(StateChange::ThresholdSet { threshold: 2 }).unwrap();
        }

        let (mut store, records) = JournalStore::open(dir.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.last_sequence(), 2);

        let third = store.append(StateChange::ThresholdSet { threshold: 3 }).unwrap();
        assert_eq!(third.sequence, 3);
        assert_eq!(third.prev_hash, records[1].hash);

        let all = JournalReader::open(dir.path().join(JOURNAL_FILE)).read_all().unwrap();
        assert_eq!(all.len(), 3);
        assert!(verify_chain(&all).is_ok());
    }

    #[test]
    fn test_create_refuses_existing_journal() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::create(dir.path()).unwrap();
        store.append(StateChange::ThresholdSet { threshold: 1 }).unwrap();
        drop(store);

        let result = JournalStore::create(dir.path());
        assert!(matches!(result, Err(JournalError::AlreadyExists(_))));
    }

    #[test]
    fn test_second_writer_is_locked_out() {
        let dir = TempDir::new().unwrap();
        let (first, _) = JournalStore::open(dir.path()).unwrap();

        let second = JournalStore::open(dir.path());
        assert!(matches!(second, Err(JournalError::Locked(ref p)) if p.ends_with(LOCK_FILE)));

        drop(first);
        assert!(JournalStore::open(dir.path()).is_ok());
    }

    #[test]
    fn test_failed_write_rewinds_file() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::create(dir.path()).unwrap();
        store.append(StateChange::ThresholdSet { threshold: 1 }).unwrap();
        let path = store.path().to_path_buf();
        let len_before = fs::metadata(&path).unwrap().len();

        let Backend::File { file, .. } = &mut store.backend else {
            panic!("expected a file-backed store");
        };
        let result = append_or_rewind(file, b"{\"sequence\":2,\"prev_hash\":\"abc\"}\n", |f, bytes| {
            f.write_all(&bytes[..bytes.len() / 2])?;
            Err(io::Error::other("disk full"))
        });
        assert!(result.is_err());
        assert_eq!(fs::metadata(&path).unwrap().len(), len_before);

        // The chain continues cleanly after the failed write
        store.append(StateChange::ThresholdSet { threshold: 2 }).unwrap();
        drop(store);
        let (_, records) = JournalStore::open(dir.path()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_append_limit() {
        let mut store = JournalStore::in_memory();
        store.limit_appends(Some(1));
        store.append(StateChange::ThresholdSet { threshold: 1 }).unwrap();

        let result = store.append(StateChange::ThresholdSet { threshold: 2 });
        assert!(matches!(result, Err(JournalError::Io(_))));
        assert_eq!(store.last_sequence(), 1);

        store.limit_appends(None);
        let record = store.append(StateChange::ThresholdSet { threshold: 2 }).unwrap();
        assert_eq!(record.sequence, 2);
    }
}
