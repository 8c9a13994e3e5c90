//! Library service
//!
//! Every write goes to the durable store first. Only a committed write is
//! passed on to the index coordinator, so a rejected or failed write leaves
//! the indexes exactly as they were.

use chrono::{Days, Local, NaiveDate};

use crate::index::{IndexConfig, IndexCoordinator, IndexStats};
use crate::observability::{log_event_with_fields, Event};
use crate::store::{RecordStore, StoreError};

use super::errors::{CatalogError, CatalogResult};
use super::loan::{Loan, LoanDraft};
use super::record::{Record, RecordDraft, RecordId, RecordRef};
use super::validation::{validate_draft, validate_loan, validate_record};

/// A record catalog: a durable store plus the indexes derived from it
pub struct Library<S: RecordStore> {
    store: S,
    indexes: IndexCoordinator,
}

impl<S: RecordStore> Library<S> {
    /// Build the indexes for `store` and return the ready service
    pub fn open(store: S, config: IndexConfig) -> CatalogResult<Self> {
        let mut indexes = IndexCoordinator::new(config)?;
        indexes.load(&store)?;
        Ok(Self { store, indexes })
    }

    /// Returns the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the service, returning the store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Validate, persist and index a new record
    pub fn add_record(&mut self, draft: RecordDraft) -> CatalogResult<RecordRef> {
        if let Err(e) = validate_draft(&draft) {
            log_event_with_fields(Event::WriteRejected, &[("reason", &e.to_string())]);
            return Err(e);
        }

        let record = self.store.insert(draft).map_err(commit_failed)?;
        self.indexes.on_created(record.clone());

        log_event_with_fields(Event::RecordCreated, &[("id", &record.id.to_string())]);
        Ok(record)
    }

    /// Validate, persist and re-index an existing record
    pub fn update_record(&mut self, record: Record) -> CatalogResult<RecordRef> {
        if let Err(e) = validate_record(&record) {
            log_event_with_fields(Event::WriteRejected, &[("reason", &e.to_string())]);
            return Err(e);
        }

        let record = self.store.update(record).map_err(commit_failed)?;
        self.indexes.on_updated(record.clone());

        log_event_with_fields(Event::RecordUpdated, &[("id", &record.id.to_string())]);
        Ok(record)
    }

    /// Delete a record from the store and from every index.
    ///
    /// A record that is currently borrowed is refused.
    pub fn remove_record(&mut self, id: RecordId) -> CatalogResult<RecordRef> {
        if self.store.open_loan(id)?.is_some() {
            let e = CatalogError::OnLoan(id);
            log_event_with_fields(Event::WriteRejected, &[("reason", &e.to_string())]);
            return Err(e);
        }

        let removed = self.store.remove(id).map_err(commit_failed)?;
        self.indexes.on_removed(id);

        log_event_with_fields(Event::RecordRemoved, &[("id", &id.to_string())]);
        Ok(removed)
    }

    /// Lend a record to `borrower` for `loan_days`, starting today
    pub fn borrow_record(
        &mut self,
        id: RecordId,
        borrower: &str,
        loan_days: u32,
    ) -> CatalogResult<Loan> {
        self.borrow_record_on(id, borrower, loan_days, today())
    }

    /// Lend a record starting on `borrowed_on`.
    ///
    /// The record must exist and be available. The loan and the record's
    /// availability are committed together, then the record is re-indexed.
    pub fn borrow_record_on(
        &mut self,
        id: RecordId,
        borrower: &str,
        loan_days: u32,
        borrowed_on: NaiveDate,
    ) -> CatalogResult<Loan> {
        let due_on = validate_loan(borrower, loan_days).and_then(|_| {
            borrowed_on
                .checked_add_days(Days::new(loan_days.into()))
                .ok_or_else(|| CatalogError::Validation("Loan period is too long".to_string()))
        });
        let due_on = match due_on {
            Ok(due_on) => due_on,
            Err(e) => {
                log_event_with_fields(Event::WriteRejected, &[("reason", &e.to_string())]);
                return Err(e);
            }
        };

        let current = self.store.fetch_by_id(id)?.ok_or(StoreError::NotFound(id))?;
        if !current.is_available {
            let e = CatalogError::Unavailable(id);
            log_event_with_fields(Event::WriteRejected, &[("reason", &e.to_string())]);
            return Err(e);
        }

        let draft = LoanDraft {
            record_id: id,
            borrower: borrower.trim().to_string(),
            borrowed_on,
            due_on,
        };
        let (record, loan) = self.store.lend(draft).map_err(commit_failed)?;
        self.indexes.on_updated(record);

        log_event_with_fields(
            Event::RecordBorrowed,
            &[
                ("id", &id.to_string()),
                ("loan", &loan.id.to_string()),
                ("due_on", &loan.due_on.to_string()),
            ],
        );
        Ok(loan)
    }

    /// Close the open loan of a record today
    pub fn return_record(&mut self, id: RecordId) -> CatalogResult<Loan> {
        self.return_record_on(id, today())
    }

    /// Close the open loan of a record on `returned_on`
    pub fn return_record_on(
        &mut self,
        id: RecordId,
        returned_on: NaiveDate,
    ) -> CatalogResult<Loan> {
        let (record, loan) = self
            .store
            .take_back(id, returned_on)
            .map_err(commit_failed)?;
        self.indexes.on_updated(record);

        log_event_with_fields(
            Event::RecordReturned,
            &[("id", &id.to_string()), ("loan", &loan.id.to_string())],
        );
        Ok(loan)
    }

    /// Every loan, open and returned, in loan id order
    pub fn loans(&self) -> CatalogResult<Vec<Loan>> {
        Ok(self.store.loans()?)
    }

    /// Open loans due before today, earliest due date first
    pub fn overdue(&self) -> CatalogResult<Vec<Loan>> {
        self.overdue_on(today())
    }

    /// Open loans due before `today`, earliest due date first
    pub fn overdue_on(&self, today: NaiveDate) -> CatalogResult<Vec<Loan>> {
        let mut overdue: Vec<Loan> = self
            .store
            .loans()?
            .into_iter()
            .filter(|loan| loan.is_overdue(today))
            .collect();
        overdue.sort_by_key(|loan| (loan.due_on, loan.id));
        Ok(overdue)
    }

    /// Point lookup through the id cache
    pub fn get_record(&mut self, id: RecordId) -> CatalogResult<Option<RecordRef>> {
        Ok(self.indexes.find_by_id(id, &self.store)?)
    }

    /// Records whose title starts with `query`, ignoring case
    pub fn search_by_title(&self, query: &str) -> Vec<RecordRef> {
        self.indexes.find_by_title_prefix(query)
    }

    /// Records whose author starts with `query`, ignoring case
    pub fn search_by_author(&self, query: &str) -> Vec<RecordRef> {
        self.indexes.find_by_author_prefix(query)
    }

    /// Records whose genre equals `query`, ignoring case
    pub fn search_by_genre(&self, query: &str) -> Vec<RecordRef> {
        self.indexes.find_by_genre_exact(query)
    }

    /// Every record, straight from the store, in id order
    pub fn all_records(&self) -> CatalogResult<Vec<RecordRef>> {
        Ok(self.store.enumerate_all()?)
    }

    /// Check the structural invariants of every index
    pub fn verify(&self) -> CatalogResult<()> {
        Ok(self.indexes.verify()?)
    }

    /// Returns index counters and sizes
    pub fn stats(&self) -> IndexStats {
        self.indexes.stats()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn commit_failed(e: StoreError) -> CatalogError {
    log_event_with_fields(
        Event::CommitFailed,
        &[("code", e.code()), ("reason", &e.to_string())],
    );
    CatalogError::Store(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::UpdatePolicy;
    use crate::store::{MemoryStore, RecordSource, StoreResult};

    /// Store whose writes can be switched off
    struct FlakyStore {
        inner: MemoryStore,
        reject_writes: bool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                reject_writes: false,
            }
        }

        fn check(&self) -> StoreResult<()> {
            if self.reject_writes {
                return Err(StoreError::io("commit", std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    impl RecordSource for FlakyStore {
        fn enumerate_all(&self) -> StoreResult<Vec<RecordRef>> {
            self.inner.enumerate_all()
        }

        fn fetch_by_id(&self, id: RecordId) -> StoreResult<Option<RecordRef>> {
            self.inner.fetch_by_id(id)
        }
    }

    impl RecordStore for FlakyStore {
        fn insert(&mut self, draft: RecordDraft) -> StoreResult<RecordRef> {
            self.check()?;
            self.inner.insert(draft)
        }

        fn update(&mut self, record: Record) -> StoreResult<RecordRef> {
            self.check()?;
            self.inner.update(record)
        }

        fn remove(&mut self, id: RecordId) -> StoreResult<RecordRef> {
            self.check()?;
            self.inner.remove(id)
        }

        fn loans(&self) -> StoreResult<Vec<Loan>> {
            self.inner.loans()
        }

        fn open_loan(&self, record_id: RecordId) -> StoreResult<Option<Loan>> {
            self.inner.open_loan(record_id)
        }

        fn lend(&mut self, draft: LoanDraft) -> StoreResult<(RecordRef, Loan)> {
            self.check()?;
            self.inner.lend(draft)
        }

        fn take_back(
            &mut self,
            record_id: RecordId,
            returned_on: NaiveDate,
        ) -> StoreResult<(RecordRef, Loan)> {
            self.check()?;
            self.inner.take_back(record_id, returned_on)
        }
    }

    fn library() -> Library<FlakyStore> {
        Library::open(FlakyStore::new(), IndexConfig::default()).unwrap()
    }

    fn draft(title: &str, author: &str, genre: &str) -> RecordDraft {
        RecordDraft::new(title, author, 1990, genre)
    }

    #[test]
    fn test_add_then_search() {
        let mut library = library();
        let record = library
            .add_record(draft("Advanced Programming", "John Doe", "Education"))
            .unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(library.search_by_title("advanced")[0].id, 1);
        assert_eq!(library.search_by_author("JOHN")[0].id, 1);
        assert_eq!(library.search_by_genre("education")[0].id, 1);
        assert_eq!(library.get_record(1).unwrap().unwrap().title, "Advanced Programming");
    }

    #[test]
    fn test_invalid_record_touches_nothing() {
        let mut library = library();
        let err = library.add_record(draft("", "Author", "Genre")).unwrap_err();

        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(library.all_records().unwrap().is_empty());
        assert_eq!(library.stats().cached_records, 0);
    }

    #[test]
    fn test_failed_commit_leaves_indexes_untouched() {
        let mut library = library();
        library.add_record(draft("Dune", "Frank Herbert", "Science Fiction")).unwrap();
        library.store.reject_writes = true;

        let err = library.add_record(draft("Emma", "Jane Austen", "Classics")).unwrap_err();
        assert_eq!(err.code(), "LIBRIS_STORE_IO_ERROR");
        assert!(library.search_by_title("emma").is_empty());

        let mut renamed = (*library.get_record(1).unwrap().unwrap()).clone();
        renamed.title = "Arrakis".to_string();
        assert!(library.update_record(renamed).is_err());
        assert_eq!(library.search_by_title("dune").len(), 1);
        assert!(library.search_by_title("arrakis").is_empty());

        assert!(library.remove_record(1).is_err());
        assert_eq!(library.search_by_genre("science fiction").len(), 1);
        library.verify().unwrap();
    }

    #[test]
    fn test_update_and_remove() {
        let mut library = library();
        let record = library.add_record(draft("Dune", "Frank Herbert", "Sci-Fi")).unwrap();

        let mut changed = (*record).clone();
        changed.genre = "Science Fiction".to_string();
        library.update_record(changed).unwrap();

        assert!(library.search_by_genre("sci-fi").is_empty());
        assert_eq!(library.search_by_genre("science fiction").len(), 1);

        library.remove_record(record.id).unwrap();
        assert!(library.get_record(record.id).unwrap().is_none());
        assert!(library.search_by_author("frank").is_empty());
        library.verify().unwrap();
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut library = library();
        let err = library.remove_record(42).unwrap_err();
        assert_eq!(err.code(), "LIBRIS_STORE_NOT_FOUND");
    }

    #[test]
    fn test_keep_stale_policy_through_service() {
        let config = IndexConfig {
            update_policy: UpdatePolicy::KeepStale,
            ..IndexConfig::default()
        };
        let mut library = Library::open(MemoryStore::new(), config).unwrap();
        let record = library.add_record(draft("Dune", "Frank Herbert", "Sci-Fi")).unwrap();

        let mut changed = (*record).clone();
        changed.title = "Arrakis".to_string();
        library.update_record(changed).unwrap();

        assert_eq!(library.search_by_title("dune")[0].title, "Dune");
        assert_eq!(library.get_record(record.id).unwrap().unwrap().title, "Arrakis");
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_borrow_and_return() {
        let mut library = library();
        library.add_record(draft("Dune", "Frank Herbert", "Sci-Fi")).unwrap();

        let loan = library.borrow_record_on(1, "  Paul Atreides ", 14, day(1)).unwrap();
        assert_eq!(loan.borrower, "Paul Atreides");
        assert_eq!(loan.due_on, day(15));
        assert!(!library.get_record(1).unwrap().unwrap().is_available);
        assert!(!library.search_by_title("dune")[0].is_available);

        let err = library.borrow_record_on(1, "Chani", 7, day(2)).unwrap_err();
        assert_eq!(err.code(), "LIBRIS_RECORD_UNAVAILABLE");

        let returned = library.return_record_on(1, day(10)).unwrap();
        assert_eq!(returned.id, loan.id);
        assert_eq!(returned.returned_on, Some(day(10)));
        assert!(library.get_record(1).unwrap().unwrap().is_available);
        assert!(library.search_by_genre("sci-fi")[0].is_available);
        library.verify().unwrap();
    }

    #[test]
    fn test_borrow_rejections() {
        let mut library = library();
        library.add_record(draft("Dune", "Frank Herbert", "Sci-Fi")).unwrap();

        let err = library.borrow_record_on(1, " ", 14, day(1)).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        let err = library.borrow_record_on(1, "Paul", 0, day(1)).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        let err = library.borrow_record_on(9, "Paul", 14, day(1)).unwrap_err();
        assert_eq!(err.code(), "LIBRIS_STORE_NOT_FOUND");

        // Marked unavailable by hand
        let mut record = (*library.get_record(1).unwrap().unwrap()).clone();
        record.is_available = false;
        library.update_record(record).unwrap();
        let err = library.borrow_record_on(1, "Paul", 14, day(1)).unwrap_err();
        assert_eq!(err.code(), "LIBRIS_RECORD_UNAVAILABLE");

        assert!(library.loans().unwrap().is_empty());
    }

    #[test]
    fn test_return_without_loan() {
        let mut library = library();
        library.add_record(draft("Dune", "Frank Herbert", "Sci-Fi")).unwrap();

        let err = library.return_record_on(1, day(1)).unwrap_err();
        assert_eq!(err.code(), "LIBRIS_STORE_NO_OPEN_LOAN");
        assert!(library.get_record(1).unwrap().unwrap().is_available);
    }

    #[test]
    fn test_remove_refused_while_borrowed() {
        let mut library = library();
        library.add_record(draft("Dune", "Frank Herbert", "Sci-Fi")).unwrap();
        library.borrow_record_on(1, "Paul", 14, day(1)).unwrap();

        let err = library.remove_record(1).unwrap_err();
        assert_eq!(err.code(), "LIBRIS_RECORD_ON_LOAN");
        assert_eq!(library.search_by_title("dune").len(), 1);

        library.return_record_on(1, day(3)).unwrap();
        library.remove_record(1).unwrap();
        assert!(library.search_by_title("dune").is_empty());
    }

    #[test]
    fn test_overdue_sorted_by_due_date() {
        let mut library = library();
        for title in ["Dune", "Emma", "Ulysses", "Beloved"] {
            library.add_record(draft(title, "Author", "Fiction")).unwrap();
        }
        library.borrow_record_on(1, "A", 10, day(1)).unwrap(); // due 11
        library.borrow_record_on(2, "B", 3, day(1)).unwrap(); // due 4
        library.borrow_record_on(3, "C", 30, day(1)).unwrap(); // due July 1
        library.borrow_record_on(4, "D", 2, day(1)).unwrap(); // due 3
        library.return_record_on(4, day(20)).unwrap();

        let overdue = library.overdue_on(day(12)).unwrap();
        let records: Vec<RecordId> = overdue.iter().map(|loan| loan.record_id).collect();
        assert_eq!(records, vec![2, 1]);

        // Due today is not overdue yet
        assert_eq!(library.overdue_on(day(11)).unwrap().len(), 1);
        assert_eq!(library.loans().unwrap().len(), 4);
    }

    #[test]
    fn test_failed_loan_commit_leaves_indexes_untouched() {
        let mut library = library();
        library.add_record(draft("Dune", "Frank Herbert", "Sci-Fi")).unwrap();
        library.store.reject_writes = true;

        assert!(library.borrow_record_on(1, "Paul", 14, day(1)).is_err());
        assert!(library.search_by_title("dune")[0].is_available);
        assert!(library.loans().unwrap().is_empty());
    }
}
