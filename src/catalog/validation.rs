//! Record validation
//!
//! Runs before a write reaches the durable store. A rejected write never
//! touches the store or the indexes.

use chrono::{Datelike, Local};

use super::errors::{CatalogError, CatalogResult};
use super::record::{Record, RecordDraft};

/// Maximum title length in characters
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum author length in characters
pub const MAX_AUTHOR_LEN: usize = 100;
/// Maximum genre length in characters
pub const MAX_GENRE_LEN: usize = 50;
/// Earliest accepted publication year
pub const MIN_PUBLICATION_YEAR: i32 = 1000;

/// Validate a draft against the current calendar year
pub fn validate_draft(draft: &RecordDraft) -> CatalogResult<()> {
    validate_fields(
        &draft.title,
        &draft.author,
        &draft.genre,
        draft.publication_year,
        Local::now().year(),
    )
}

/// Validate a full record against the current calendar year
pub fn validate_record(record: &Record) -> CatalogResult<()> {
    validate_fields(
        &record.title,
        &record.author,
        &record.genre,
        record.publication_year,
        Local::now().year(),
    )
}

/// Validate the borrower name and loan period of a new loan
pub fn validate_loan(borrower: &str, loan_days: u32) -> CatalogResult<()> {
    if borrower.trim().is_empty() {
        return Err(CatalogError::Validation("Borrower name is required".to_string()));
    }
    if loan_days == 0 {
        return Err(CatalogError::Validation(
            "Loan period must be at least 1 day".to_string(),
        ));
    }
    Ok(())
}

fn validate_fields(
    title: &str,
    author: &str,
    genre: &str,
    publication_year: i32,
    current_year: i32,
) -> CatalogResult<()> {
    check_text("Title", title, MAX_TITLE_LEN)?;
    check_text("Author", author, MAX_AUTHOR_LEN)?;

    if !(MIN_PUBLICATION_YEAR..=current_year).contains(&publication_year) {
        return Err(CatalogError::Validation(format!(
            "Invalid publication year {}: must be between {} and {}",
            publication_year, MIN_PUBLICATION_YEAR, current_year
        )));
    }

    check_text("Genre", genre, MAX_GENRE_LEN)
}

fn check_text(field: &str, value: &str, max_len: usize) -> CatalogResult<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max_len {
        return Err(CatalogError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}
