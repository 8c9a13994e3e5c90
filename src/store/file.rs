//! Checksummed JSON-lines record store
//!
//! File layout, one entry per line:
//!
//! ```text
//! <crc32 hex> {"version":1,"last_id":3,"last_loan_id":1}
//! <crc32 hex> {"entry":"record","id":1,"title":...}
//! <crc32 hex> {"entry":"record","id":3,"title":...}
//! <crc32 hex> {"entry":"loan","id":1,"record_id":3,...}
//! ```
//!
//! The first line is the header. Every line carries the CRC32 of its JSON
//! text and is verified on open; any mismatch halts with a corruption error.
//! Commits rewrite the whole file into a sibling temp file, fsync it and
//! rename it over the original, so a crash leaves either the old or the new
//! file. In-memory state changes only after the rename succeeded.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::catalog::{Loan, LoanDraft, LoanId, Record, RecordDraft, RecordId, RecordRef};

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StoreError, StoreResult};
use super::state::StoreState;
use super::{RecordSource, RecordStore};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreHeader {
    version: u32,
    last_id: RecordId,
    #[serde(default)]
    last_loan_id: LoanId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum StoreEntry<'a> {
    Record(Cow<'a, Record>),
    Loan(Cow<'a, Loan>),
}

/// Durable store persisted as a checksummed JSON-lines file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: StoreState,
}

impl FileStore {
    /// Create a new, empty store file.
    ///
    /// Fails if a file already exists at `path`. Missing parent directories
    /// are created.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            return Err(StoreError::AlreadyExists(path));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::io(format!("failed to create directory {}", parent.display()), e)
            })?;
        }

        let store = Self {
            path,
            state: StoreState::default(),
        };
        store.persist(&store.state)?;
        Ok(store)
    }

    /// Open an existing store file, verifying every line
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path).map_err(|e| {
            StoreError::io(format!("failed to read store file {}", path.display()), e)
        })?;

        let mut lines = content.lines().enumerate().map(|(i, line)| (i + 1, line));
        let (line_no, first) = lines.next().ok_or_else(|| StoreError::Corruption {
            line: 1,
            reason: "missing header".to_string(),
        })?;

        let header: StoreHeader = decode_line(line_no, first)?;
        if header.version != FORMAT_VERSION {
            return Err(StoreError::Corruption {
                line: line_no,
                reason: format!("unsupported format version {}", header.version),
            });
        }

        let mut state = StoreState {
            last_id: header.last_id,
            last_loan_id: header.last_loan_id,
            ..StoreState::default()
        };
        let mut open_loans = Vec::new();

        for (line_no, line) in lines {
            if line.is_empty() {
                continue;
            }
            let corruption = |reason: String| StoreError::Corruption {
                line: line_no,
                reason,
            };

            match decode_line::<StoreEntry>(line_no, line)? {
                StoreEntry::Record(record) => {
                    let record = record.into_owned();
                    if record.id == 0 || record.id > header.last_id {
                        return Err(corruption(format!(
                            "record id {} outside 1..={}",
                            record.id, header.last_id
                        )));
                    }
                    if state.records.insert(record.id, Arc::new(record)).is_some() {
                        return Err(corruption("duplicate record id".to_string()));
                    }
                }
                StoreEntry::Loan(loan) => {
                    let loan = loan.into_owned();
                    if loan.id == 0 || loan.id > header.last_loan_id {
                        return Err(corruption(format!(
                            "loan id {} outside 1..={}",
                            loan.id, header.last_loan_id
                        )));
                    }
                    if loan.is_open() {
                        open_loans.push((line_no, loan.record_id));
                    }
                    if state.loans.insert(loan.id, loan).is_some() {
                        return Err(corruption("duplicate loan id".to_string()));
                    }
                }
            }
        }

        // Open loans must point at an existing record, one loan per record
        let mut loaned = HashSet::new();
        for (line_no, record_id) in open_loans {
            let reason = if !state.records.contains_key(&record_id) {
                format!("open loan for missing record {}", record_id)
            } else if !loaned.insert(record_id) {
                format!("second open loan for record {}", record_id)
            } else {
                continue;
            };
            return Err(StoreError::Corruption {
                line: line_no,
                reason,
            });
        }

        Ok(Self { path, state })
    }

    /// Returns the path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of records
    pub fn len(&self) -> usize {
        self.state.records.len()
    }

    /// Returns true if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.state.records.is_empty()
    }

    /// Write `state` to disk as the new committed state
    fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let mut content = String::new();
        encode_line(
            &mut content,
            &StoreHeader {
                version: FORMAT_VERSION,
                last_id: state.last_id,
                last_loan_id: state.last_loan_id,
            },
        )?;
        for record in state.records.values() {
            encode_line(&mut content, &StoreEntry::Record(Cow::Borrowed(record.as_ref())))?;
        }
        for loan in state.loans.values() {
            encode_line(&mut content, &StoreEntry::Loan(Cow::Borrowed(loan)))?;
        }

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path).map_err(|e| {
            StoreError::io(format!("failed to create {}", temp_path.display()), e)
        })?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::io(format!("failed to write {}", temp_path.display()), e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            StoreError::io(format!("failed to replace {}", self.path.display()), e)
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Apply `write` to a copy of the state, persist it, then swap it in
    fn commit<T>(
        &mut self,
        write: impl FnOnce(&mut StoreState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut next = self.state.clone();
        let out = write(&mut next)?;
        self.persist(&next)?;
        self.state = next;
        Ok(out)
    }
}

impl RecordSource for FileStore {
    fn enumerate_all(&self) -> StoreResult<Vec<RecordRef>> {
        Ok(self.state.records.values().cloned().collect())
    }

    fn fetch_by_id(&self, id: RecordId) -> StoreResult<Option<RecordRef>> {
        Ok(self.state.records.get(&id).cloned())
    }
}

impl RecordStore for FileStore {
    fn insert(&mut self, draft: RecordDraft) -> StoreResult<RecordRef> {
        self.commit(|state| state.insert(draft))
    }

    fn update(&mut self, record: Record) -> StoreResult<RecordRef> {
        self.commit(|state| state.update(record))
    }

    fn remove(&mut self, id: RecordId) -> StoreResult<RecordRef> {
        self.commit(|state| state.remove(id))
    }

    fn loans(&self) -> StoreResult<Vec<Loan>> {
        Ok(self.state.loans.values().cloned().collect())
    }

    fn open_loan(&self, record_id: RecordId) -> StoreResult<Option<Loan>> {
        Ok(self.state.open_loan(record_id).cloned())
    }

    fn lend(&mut self, draft: LoanDraft) -> StoreResult<(RecordRef, Loan)> {
        self.commit(|state| state.lend(draft))
    }

    fn take_back(
        &mut self,
        record_id: RecordId,
        returned_on: NaiveDate,
    ) -> StoreResult<(RecordRef, Loan)> {
        self.commit(|state| state.take_back(record_id, returned_on))
    }
}

fn encode_line<T: Serialize + ?Sized>(out: &mut String, value: &T) -> StoreResult<()> {
    let json = serde_json::to_string(value)?;
    out.push_str(&format!("{:08x} {}\n", compute_checksum(json.as_bytes()), json));
    Ok(())
}

fn decode_line<T: DeserializeOwned>(line_no: usize, line: &str) -> StoreResult<T> {
    let corruption = |reason: String| StoreError::Corruption {
        line: line_no,
        reason,
    };

    let (checksum, json) = line
        .split_once(' ')
        .ok_or_else(|| corruption("missing checksum".to_string()))?;
    let checksum = u32::from_str_radix(checksum, 16)
        .map_err(|e| corruption(format!("invalid checksum: {}", e)))?;
    if !verify_checksum(json.as_bytes(), checksum) {
        return Err(corruption("checksum mismatch".to_string()));
    }

    serde_json::from_str(json).map_err(|e| corruption(format!("invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(title: &str) -> RecordDraft {
        RecordDraft::new(title, "Ursula K. Le Guin", 1969, "Science Fiction")
    }

    #[test]
    fn test_create_then_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");

        {
            let mut store = FileStore::create(&path).unwrap();
            store.insert(draft("The Left Hand of Darkness")).unwrap();
            store.insert(draft("The Dispossessed")).unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        let records = store.enumerate_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].title, "The Dispossessed");
        assert_eq!(store.fetch_by_id(1).unwrap().unwrap().title, "The Left Hand of Darkness");
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");
        FileStore::create(&path).unwrap();

        assert!(matches!(FileStore::create(&path), Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn test_ids_not_reused_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");

        {
            let mut store = FileStore::create(&path).unwrap();
            store.insert(draft("a")).unwrap();
            store.insert(draft("b")).unwrap();
            store.remove(2).unwrap();
        }

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.insert(draft("c")).unwrap().id, 3);
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");
        {
            let mut store = FileStore::create(&path).unwrap();
            store.insert(draft("Earthsea")).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("Earthsea", "Earthsee")).unwrap();

        match FileStore::open(&path) {
            Err(StoreError::Corruption { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("checksum"));
            }
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_header_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");
        fs::write(&path, "").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Corruption { line: 1, .. })
        ));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");
        let mut store = FileStore::create(&path).unwrap();
        store.insert(draft("a")).unwrap();

        assert!(!dir.path().join("catalog.jsonl.tmp").exists());
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    #[test]
    fn test_loans_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");

        {
            let mut store = FileStore::create(&path).unwrap();
            store.insert(draft("Earthsea")).unwrap();
            store.insert(draft("Lavinia")).unwrap();
            for record_id in [1, 2] {
                store
                    .lend(LoanDraft {
                        record_id,
                        borrower: "Ged".to_string(),
                        borrowed_on: day(1),
                        due_on: day(15),
                    })
                    .unwrap();
            }
            store.take_back(1, day(10)).unwrap();
        }

        let mut store = FileStore::open(&path).unwrap();
        let loans = store.loans().unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].returned_on, Some(day(10)));
        assert!(store.open_loan(1).unwrap().is_none());
        assert_eq!(store.open_loan(2).unwrap().unwrap().borrower, "Ged");
        assert!(!store.fetch_by_id(2).unwrap().unwrap().is_available);
        assert!(matches!(store.remove(2), Err(StoreError::OnLoan(2))));
    }

    #[test]
    fn test_open_loan_for_missing_record_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");

        let loan = LoanDraft {
            record_id: 5,
            borrower: "Ged".to_string(),
            borrowed_on: day(1),
            due_on: day(15),
        }
        .into_loan(1);
        let mut content = String::new();
        encode_line(
            &mut content,
            &StoreHeader {
                version: FORMAT_VERSION,
                last_id: 5,
                last_loan_id: 1,
            },
        )
        .unwrap();
        encode_line(&mut content, &StoreEntry::Loan(Cow::Owned(loan))).unwrap();
        fs::write(&path, content).unwrap();

        match FileStore::open(&path) {
            Err(StoreError::Corruption { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("missing record"));
            }
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_write_keeps_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.jsonl");
        let mut store = FileStore::create(&path).unwrap();
        store.insert(draft("Earthsea")).unwrap();

        assert!(store.remove(9).is_err());
        assert!(store.take_back(1, day(1)).is_err());
        assert_eq!(store.len(), 1);
        assert!(store.fetch_by_id(1).unwrap().unwrap().is_available);
    }
}
