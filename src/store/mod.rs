//! Durable record store
//!
//! The store holds the canonical state of every record. Indexes consume only
//! the read half ([`RecordSource`]); the catalog service drives the write half
//! ([`RecordStore`]) and notifies the indexes after each successful commit.
//!
//! # Implementations
//!
//! - [`MemoryStore`]: `BTreeMap`-backed, for tests and embedding
//! - [`FileStore`]: checksummed JSON-lines file, rewritten atomically on commit

mod checksum;
mod errors;
mod file;
mod memory;
mod state;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

use chrono::NaiveDate;

use crate::catalog::{Loan, LoanDraft, Record, RecordDraft, RecordId, RecordRef};

/// Read access the index layer needs from the durable store
pub trait RecordSource {
    /// Every record, in ascending id order
    fn enumerate_all(&self) -> StoreResult<Vec<RecordRef>>;

    /// Point lookup. A missing id is `Ok(None)`, not an error.
    fn fetch_by_id(&self, id: RecordId) -> StoreResult<Option<RecordRef>>;
}

/// A durable store that accepts writes.
///
/// Each write either commits fully and returns the committed handle, or
/// fails and leaves the store unchanged.
pub trait RecordStore: RecordSource {
    /// Assign the next id to `draft` and persist it
    fn insert(&mut self, draft: RecordDraft) -> StoreResult<RecordRef>;

    /// Replace the record with the same id
    fn update(&mut self, record: Record) -> StoreResult<RecordRef>;

    /// Delete a record, returning the last committed version.
    ///
    /// Fails with [`StoreError::OnLoan`] while the record has an open loan.
    fn remove(&mut self, id: RecordId) -> StoreResult<RecordRef>;

    /// Every loan ever recorded, in ascending loan id order
    fn loans(&self) -> StoreResult<Vec<Loan>>;

    /// The open loan of a record, if any
    fn open_loan(&self, record_id: RecordId) -> StoreResult<Option<Loan>>;

    /// Record a loan and mark its record unavailable in one commit.
    ///
    /// Returns the updated record and the new loan.
    fn lend(&mut self, draft: LoanDraft) -> StoreResult<(RecordRef, Loan)>;

    /// Close the open loan of a record and mark it available in one commit
    fn take_back(
        &mut self,
        record_id: RecordId,
        returned_on: NaiveDate,
    ) -> StoreResult<(RecordRef, Loan)>;
}
