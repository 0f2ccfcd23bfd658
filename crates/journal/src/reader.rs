//! JSONL journal reader - sequential reader for replay and audit
//!
//! A final line without its trailing newline is a torn write: the append
//! never returned, so the record was never acknowledged. It is reported
//! separately instead of failing the read. A bad line anywhere else is
//! corruption and fails closed.

use crate::error::JournalError;
use crate::record::JournalRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Sequential reader over a journal file
pub struct JournalReader {
    path: PathBuf,
}

/// Everything a scan found in a journal file
#[derive(Debug, Default)]
pub struct JournalScan {
    pub records: Vec<JournalRecord>,
    /// Byte length of the complete lines
    pub valid_len: u64,
    /// Size in bytes of an unterminated final line
    pub torn_tail: Option<u64>,
}

impl JournalReader {
    /// Reader for the given journal file. A missing file reads as empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse every complete line, noting a torn tail without failing on it
    pub fn scan(&self) -> Result<JournalScan, JournalError> {
        let mut scan = JournalScan::default();
        if !self.path.exists() {
            return Ok(scan);
        }

        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut line_no = 0;

        loop {
            let mut buf = Vec::new();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            line_no += 1;

            if buf.last() != Some(&b'\n') {
                scan.torn_tail = Some(read as u64);
                break;
            }
            scan.valid_len += read as u64;

            let line = std::str::from_utf8(&buf).map_err(|e| JournalError::InvalidLine {
                line: line_no,
                reason: e.to_string(),
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: JournalRecord =
                serde_json::from_str(line).map_err(|e| JournalError::InvalidLine {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            scan.records.push(record);
        }

        Ok(scan)
    }

    /// Read all acknowledged records in file order
    pub fn read_all(&self) -> Result<Vec<JournalRecord>, JournalError> {
        let scan = self.scan()?;
        if let Some(bytes) = scan.torn_tail {
            tracing::warn!(path = %self.path.display(), bytes, "Ignoring torn journal tail");
        }
        Ok(scan.records)
    }
}
