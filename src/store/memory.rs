//! In-memory record store

use std::sync::Arc;

use chrono::NaiveDate;

use crate::catalog::{Loan, LoanDraft, Record, RecordDraft, RecordId, RecordRef};

use super::errors::StoreResult;
use super::state::StoreState;
use super::{RecordSource, RecordStore};

/// Volatile store backed by `BTreeMap`s
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: StoreState,
}

impl MemoryStore {
    /// Creates an empty store; the first insert gets id 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records` as already committed
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut state = StoreState::default();
        for record in records {
            state.last_id = state.last_id.max(record.id);
            state.records.insert(record.id, Arc::new(record));
        }
        Self { state }
    }

    /// Returns the number of records
    pub fn len(&self) -> usize {
        self.state.records.len()
    }

    /// Returns true if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.state.records.is_empty()
    }
}

impl RecordSource for MemoryStore {
    fn enumerate_all(&self) -> StoreResult<Vec<RecordRef>> {
        Ok(self.state.records.values().cloned().collect())
    }

    fn fetch_by_id(&self, id: RecordId) -> StoreResult<Option<RecordRef>> {
        Ok(self.state.records.get(&id).cloned())
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, draft: RecordDraft) -> StoreResult<RecordRef> {
        self.state.insert(draft)
    }

    fn update(&mut self, record: Record) -> StoreResult<RecordRef> {
        self.state.update(record)
    }

    fn remove(&mut self, id: RecordId) -> StoreResult<RecordRef> {
        self.state.remove(id)
    }

    fn loans(&self) -> StoreResult<Vec<Loan>> {
        Ok(self.state.loans.values().cloned().collect())
    }

    fn open_loan(&self, record_id: RecordId) -> StoreResult<Option<Loan>> {
        Ok(self.state.open_loan(record_id).cloned())
    }

    fn lend(&mut self, draft: LoanDraft) -> StoreResult<(RecordRef, Loan)> {
        self.state.lend(draft)
    }

    fn take_back(
        &mut self,
        record_id: RecordId,
        returned_on: NaiveDate,
    ) -> StoreResult<(RecordRef, Loan)> {
        self.state.take_back(record_id, returned_on)
    }
}
