//! Loan model and related types

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    book::Book,
    pagination::{Page, SortOrder},
    reader::Reader,
};
use crate::error::{AppError, AppResult};

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub loan_date: DateTime<Utc>,
    /// Always `loan_date` plus the loan duration
    pub limit_return_date: DateTime<Utc>,
    /// Set if and only if `returned`
    pub returned_date: Option<DateTime<Utc>>,
    pub returned: bool,
    pub reader_id: i32,
    pub book_id: i32,
}

/// Lifecycle of a loan. `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
}

impl Loan {
    pub fn status(&self) -> LoanStatus {
        if self.returned {
            LoanStatus::Returned
        } else {
            LoanStatus::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == LoanStatus::Active
    }

    /// Value of the given date column
    pub fn date(&self, field: LoanDateField) -> Option<DateTime<Utc>> {
        match field {
            LoanDateField::LoanDate => Some(self.loan_date),
            LoanDateField::LimitReturnDate => Some(self.limit_return_date),
            LoanDateField::ReturnedDate => self.returned_date,
        }
    }

    /// Transition Active -> Returned
    pub fn mark_returned(&mut self, at: DateTime<Utc>) -> AppResult<()> {
        if self.returned {
            return Err(AppError::already_returned(self.id));
        }
        self.returned = true;
        self.returned_date = Some(at);
        Ok(())
    }
}

/// Row to insert when a loan is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub reader_id: i32,
    pub book_id: i32,
    pub loan_date: DateTime<Utc>,
    pub limit_return_date: DateTime<Utc>,
}

/// Loan joined with its reader and book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub loan_date: DateTime<Utc>,
    pub limit_return_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub returned: bool,
    pub reader: Reader,
    pub book: Book,
}

impl LoanDetails {
    pub fn new(loan: Loan, reader: Reader, book: Book) -> Self {
        Self {
            id: loan.id,
            loan_date: loan.loan_date,
            limit_return_date: loan.limit_return_date,
            returned_date: loan.returned_date,
            returned: loan.returned,
            reader,
            book,
        }
    }
}

/// Create loans request: one reader, a batch of books
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoans {
    /// CPF of the borrowing reader
    #[validate(length(equal = 11, message = "CPF must have exactly 11 characters"))]
    pub reader_cpf: String,
    /// Books to lend, in order
    #[validate(length(min = 1, message = "At least one book id is required"))]
    pub book_ids: Vec<i32>,
}

impl CreateLoans {
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))
    }

    /// First book id listed more than once, if any
    pub fn repeated_book(&self) -> Option<i32> {
        self.book_ids
            .iter()
            .enumerate()
            .find(|(i, id)| self.book_ids[..*i].contains(*id))
            .map(|(_, id)| *id)
    }
}

/// Date columns the range filter can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanDateField {
    LoanDate,
    LimitReturnDate,
    ReturnedDate,
}

impl LoanDateField {
    pub fn column(&self) -> &'static str {
        match self {
            LoanDateField::LoanDate => "loan_date",
            LoanDateField::LimitReturnDate => "limit_return_date",
            LoanDateField::ReturnedDate => "returned_date",
        }
    }
}

/// Query parameters for loans, as received
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub reader_id: Option<i32>,
    pub book_id: Option<i32>,
    pub returned: Option<bool>,
    /// Date column the range applies to (requires `first_date` and `last_date`)
    pub date_field: Option<LoanDateField>,
    /// Range start, RFC 3339 or YYYY-MM-DD
    pub first_date: Option<String>,
    /// Range end (inclusive), RFC 3339 or YYYY-MM-DD
    pub last_date: Option<String>,
    /// Number of loans to skip (requires `limit`)
    pub skip: Option<i64>,
    /// Number of loans to return
    pub limit: Option<i64>,
    /// ASC or DESC on the loan id
    pub order_by: Option<SortOrder>,
}

/// Inclusive range over one date column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub field: LoanDateField,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// Validated conjunction of loan predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub reader_id: Option<i32>,
    pub book_id: Option<i32>,
    pub returned: Option<bool>,
    pub date_range: Option<DateRange>,
    pub page: Option<Page>,
    pub order: SortOrder,
}

impl LoanQuery {
    /// Validate parameter combinations and build the filter
    pub fn into_filter(self) -> AppResult<LoanFilter> {
        let date_range = match (self.date_field, self.first_date, self.last_date) {
            (None, None, None) => None,
            (Some(field), Some(first), Some(last)) => {
                let first = parse_bound(&first, false)?;
                let last = parse_bound(&last, true)?;
                if first > last {
                    return Err(AppError::BadRequest(
                        "\"first_date\" must not be after \"last_date\"".to_string(),
                    ));
                }
                Some(DateRange { field, first, last })
            }
            (Some(_), _, _) => {
                return Err(AppError::BadRequest(
                    "\"date_field\" must be used together with \"first_date\" and \"last_date\""
                        .to_string(),
                ))
            }
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(AppError::BadRequest(
                    "\"first_date\" and \"last_date\" must be used together".to_string(),
                ))
            }
            (None, Some(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "\"first_date\" and \"last_date\" require \"date_field\"".to_string(),
                ))
            }
        };

        Ok(LoanFilter {
            reader_id: self.reader_id,
            book_id: self.book_id,
            returned: self.returned,
            date_range,
            page: Page::from_parts(self.skip, self.limit)?,
            order: self.order_by.unwrap_or_default(),
        })
    }
}

impl LoanFilter {
    /// Whether a loan satisfies every predicate (pagination aside)
    pub fn matches(&self, loan: &Loan) -> bool {
        self.reader_id.map_or(true, |id| loan.reader_id == id)
            && self.book_id.map_or(true, |id| loan.book_id == id)
            && self.returned.map_or(true, |r| loan.returned == r)
            && self.date_range.map_or(true, |range| {
                loan.date(range.field)
                    .map_or(false, |d| d >= range.first && d <= range.last)
            })
    }

    /// Same predicates, without the window
    pub fn without_page(&self) -> LoanFilter {
        LoanFilter {
            page: None,
            ..self.clone()
        }
    }
}

fn parse_bound(value: &str, end_of_day: bool) -> AppResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date: {}", value)))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| AppError::Internal("invalid time of day".to_string()))?;
    Ok(date.and_time(time).and_utc())
}

/// Active loan with the fine it has accrued so far
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingLoan {
    pub loan: LoanDetails,
    pub fine: i64,
}

/// Outstanding loans of a reader
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingLoans {
    pub loans: Vec<PendingLoan>,
    pub total_fines: i64,
}

/// Result of a return, with the fine frozen at return time
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnedLoan {
    pub loan: LoanDetails,
    pub fine: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn loan(id: i32, reader_id: i32, book_id: i32, returned: bool) -> Loan {
        let loan_date = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        Loan {
            id,
            loan_date,
            limit_return_date: loan_date + Duration::days(15),
            returned_date: returned.then(|| loan_date + Duration::days(3)),
            returned,
            reader_id,
            book_id,
        }
    }

    fn query() -> LoanQuery {
        LoanQuery::default()
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let filter = query().into_filter().unwrap();
        assert_eq!(filter.order, SortOrder::Asc);
        assert!(filter.matches(&loan(1, 1, 1, false)));
        assert!(filter.matches(&loan(2, 2, 2, true)));
    }

    #[test]
    fn test_predicates_are_a_conjunction() {
        let filter = LoanQuery {
            reader_id: Some(1),
            returned: Some(false),
            ..query()
        }
        .into_filter()
        .unwrap();
        assert!(filter.matches(&loan(1, 1, 7, false)));
        assert!(!filter.matches(&loan(2, 1, 7, true)));
        assert!(!filter.matches(&loan(3, 2, 7, false)));
    }

    #[test]
    fn test_date_field_requires_both_bounds() {
        let result = LoanQuery {
            date_field: Some(LoanDateField::LoanDate),
            first_date: Some("2024-03-01".to_string()),
            ..query()
        }
        .into_filter();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_single_bound_is_rejected() {
        let result = LoanQuery {
            last_date: Some("2024-03-01".to_string()),
            ..query()
        }
        .into_filter();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_bounds_without_field_are_rejected() {
        let result = LoanQuery {
            first_date: Some("2024-03-01".to_string()),
            last_date: Some("2024-03-02".to_string()),
            ..query()
        }
        .into_filter();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_date_range_is_inclusive_by_day() {
        let filter = LoanQuery {
            date_field: Some(LoanDateField::LimitReturnDate),
            first_date: Some("2024-03-16".to_string()),
            last_date: Some("2024-03-16".to_string()),
            ..query()
        }
        .into_filter()
        .unwrap();
        assert!(filter.matches(&loan(1, 1, 1, false)));

        let on_loan_date = LoanQuery {
            date_field: Some(LoanDateField::LoanDate),
            first_date: Some("2024-03-02".to_string()),
            last_date: Some("2024-03-20T00:00:00Z".to_string()),
            ..query()
        }
        .into_filter()
        .unwrap();
        assert!(!on_loan_date.matches(&loan(1, 1, 1, false)));
    }

    #[test]
    fn test_returned_date_range_skips_active_loans() {
        let filter = LoanQuery {
            date_field: Some(LoanDateField::ReturnedDate),
            first_date: Some("2024-03-01".to_string()),
            last_date: Some("2024-03-31".to_string()),
            ..query()
        }
        .into_filter()
        .unwrap();
        assert!(!filter.matches(&loan(1, 1, 1, false)));
        assert!(filter.matches(&loan(2, 1, 1, true)));
    }

    #[test]
    fn test_inverted_range_and_bad_dates() {
        let inverted = LoanQuery {
            date_field: Some(LoanDateField::LoanDate),
            first_date: Some("2024-03-10".to_string()),
            last_date: Some("2024-03-01".to_string()),
            ..query()
        }
        .into_filter();
        assert!(matches!(inverted, Err(AppError::BadRequest(_))));

        let garbage = LoanQuery {
            date_field: Some(LoanDateField::LoanDate),
            first_date: Some("yesterday".to_string()),
            last_date: Some("2024-03-01".to_string()),
            ..query()
        }
        .into_filter();
        assert!(matches!(garbage, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_skip_without_limit() {
        let result = LoanQuery {
            skip: Some(10),
            ..query()
        }
        .into_filter();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_repeated_book_in_batch() {
        let request = CreateLoans {
            reader_cpf: "12345678901".to_string(),
            book_ids: vec![4, 9, 4],
        };
        assert!(request.check().is_ok());
        assert_eq!(request.repeated_book(), Some(4));

        let empty = CreateLoans {
            reader_cpf: "12345678901".to_string(),
            book_ids: vec![],
        };
        assert!(matches!(empty.check(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_mark_returned_once() {
        let mut l = loan(1, 1, 1, false);
        assert!(l.is_active());
        let at = l.limit_return_date;
        l.mark_returned(at).unwrap();
        assert_eq!(l.status(), LoanStatus::Returned);
        assert!(!l.is_active());
        assert_eq!(l.returned_date, Some(at));
        assert!(matches!(
            l.mark_returned(at + Duration::days(1)),
            Err(AppError::LoanRule {
                code: crate::error::ErrorCode::AlreadyReturned,
                ..
            })
        ));
        assert_eq!(l.returned_date, Some(at));
    }
}
