//! Record catalog
//!
//! The record and loan models, validation rules and the [`Library`] service
//! that keeps the durable store and the indexes in step.

mod errors;
mod loan;
mod record;
mod service;
mod validation;

pub use errors::{CatalogError, CatalogResult};
pub use loan::{Loan, LoanDraft, LoanId, DEFAULT_LOAN_DAYS};
pub use record::{Record, RecordDraft, RecordId, RecordRef, ResourceKind};
pub use service::Library;
pub use validation::{
    validate_draft, validate_loan, validate_record, MAX_AUTHOR_LEN, MAX_GENRE_LEN,
    MAX_TITLE_LEN, MIN_PUBLICATION_YEAR,
};
