//! Committed store contents
//!
//! Both store implementations keep their data in a [`StoreState`] and apply
//! writes through it. The file store mutates a clone and swaps it in only
//! after the new state reached disk.
//!
//! Invariants kept here:
//! - record and loan ids are never reused
//! - a record has at most one open loan, and a record with an open loan is
//!   unavailable and cannot be removed

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::catalog::{Loan, LoanDraft, LoanId, Record, RecordDraft, RecordId, RecordRef};

use super::errors::{StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    pub(crate) records: BTreeMap<RecordId, RecordRef>,
    pub(crate) loans: BTreeMap<LoanId, Loan>,
    pub(crate) last_id: RecordId,
    pub(crate) last_loan_id: LoanId,
}

impl StoreState {
    pub(crate) fn insert(&mut self, draft: RecordDraft) -> StoreResult<RecordRef> {
        let id = self.last_id.checked_add(1).ok_or(StoreError::IdsExhausted)?;
        let record = Arc::new(draft.into_record(id));
        self.records.insert(id, Arc::clone(&record));
        self.last_id = id;
        Ok(record)
    }

    pub(crate) fn update(&mut self, record: Record) -> StoreResult<RecordRef> {
        if !self.records.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id));
        }
        if record.is_available && self.open_loan(record.id).is_some() {
            return Err(StoreError::OnLoan(record.id));
        }

        let record = Arc::new(record);
        self.records.insert(record.id, Arc::clone(&record));
        Ok(record)
    }

    pub(crate) fn remove(&mut self, id: RecordId) -> StoreResult<RecordRef> {
        if !self.records.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if self.open_loan(id).is_some() {
            return Err(StoreError::OnLoan(id));
        }
        self.records.remove(&id).ok_or(StoreError::NotFound(id))
    }

    pub(crate) fn open_loan(&self, record_id: RecordId) -> Option<&Loan> {
        self.loans
            .values()
            .find(|loan| loan.record_id == record_id && loan.is_open())
    }

    /// Record the loan and mark its record unavailable
    pub(crate) fn lend(&mut self, draft: LoanDraft) -> StoreResult<(RecordRef, Loan)> {
        let current = self
            .records
            .get(&draft.record_id)
            .ok_or(StoreError::NotFound(draft.record_id))?;
        if self.open_loan(draft.record_id).is_some() {
            return Err(StoreError::OnLoan(draft.record_id));
        }

        let id = self
            .last_loan_id
            .checked_add(1)
            .ok_or(StoreError::IdsExhausted)?;
        let record = Arc::new(Record {
            is_available: false,
            ..Record::clone(current)
        });
        let loan = draft.into_loan(id);

        self.records.insert(record.id, Arc::clone(&record));
        self.loans.insert(id, loan.clone());
        self.last_loan_id = id;
        Ok((record, loan))
    }

    /// Close the open loan of `record_id` and mark the record available
    pub(crate) fn take_back(
        &mut self,
        record_id: RecordId,
        returned_on: NaiveDate,
    ) -> StoreResult<(RecordRef, Loan)> {
        let loan_id = self
            .open_loan(record_id)
            .map(|loan| loan.id)
            .ok_or(StoreError::NoOpenLoan(record_id))?;
        let current = self
            .records
            .get(&record_id)
            .ok_or(StoreError::NotFound(record_id))?;

        let record = Arc::new(Record {
            is_available: true,
            ..Record::clone(current)
        });
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(StoreError::NoOpenLoan(record_id))?;
        loan.returned_on = Some(returned_on);
        let loan = loan.clone();

        self.records.insert(record_id, Arc::clone(&record));
        Ok((record, loan))
    }
}
