//! Loan model
//!
//! A loan is open from the day a record is borrowed until it is returned.
//! Returned loans stay in the store as history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::RecordId;

/// Store-assigned loan identifier
pub type LoanId = u32;

/// Default loan period in days
pub const DEFAULT_LOAN_DAYS: u32 = 14;

/// One borrowing of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub record_id: RecordId,
    pub borrower: String,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    #[serde(default)]
    pub returned_on: Option<NaiveDate>,
}

impl Loan {
    /// Returns true until the record is returned
    pub fn is_open(&self) -> bool {
        self.returned_on.is_none()
    }

    /// Open and due strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_on < today
    }
}

/// A loan that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanDraft {
    pub record_id: RecordId,
    pub borrower: String,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
}

impl LoanDraft {
    /// Turn the draft into an open loan with the given id
    pub fn into_loan(self, id: LoanId) -> Loan {
        Loan {
            id,
            record_id: self.record_id,
            borrower: self.borrower,
            borrowed_on: self.borrowed_on,
            due_on: self.due_on,
            returned_on: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan() -> Loan {
        LoanDraft {
            record_id: 7,
            borrower: "Ada".to_string(),
            borrowed_on: date(2024, 3, 1),
            due_on: date(2024, 3, 15),
        }
        .into_loan(1)
    }

    #[test]
    fn test_overdue_only_after_due_date() {
        let loan = loan();
        assert!(loan.is_open());
        assert!(!loan.is_overdue(date(2024, 3, 15)));
        assert!(loan.is_overdue(date(2024, 3, 16)));
    }

    #[test]
    fn test_returned_loan_never_overdue() {
        let mut loan = loan();
        loan.returned_on = Some(date(2024, 4, 1));
        assert!(!loan.is_open());
        assert!(!loan.is_overdue(date(2024, 5, 1)));
    }

    #[test]
    fn test_dates_serialize_as_iso() {
        let json = serde_json::to_value(loan()).unwrap();
        assert_eq!(json["due_on"], "2024-03-15");
        assert!(json["returned_on"].is_null());
    }
}
