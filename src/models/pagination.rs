//! Pagination and ordering shared by every listing

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// Ordering applied to the primary identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated skip/limit window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    /// Build a window from raw query values.
    ///
    /// `skip` is only meaningful together with `limit`; a bare `limit` starts at 0.
    pub fn from_parts(skip: Option<i64>, limit: Option<i64>) -> AppResult<Option<Page>> {
        match (skip, limit) {
            (Some(_), None) => Err(AppError::BadRequest(
                "The \"limit\" parameter must be provided when \"skip\" is used".to_string(),
            )),
            (_, Some(limit)) if limit < 1 => Err(AppError::Validation(
                "\"limit\" must be at least 1".to_string(),
            )),
            (Some(skip), Some(_)) if skip < 0 => Err(AppError::Validation(
                "\"skip\" must not be negative".to_string(),
            )),
            (skip, Some(limit)) => Ok(Some(Page {
                skip: skip.unwrap_or(0),
                limit,
            })),
            (None, None) => Ok(None),
        }
    }

    /// Reject windows that start past the last matching record
    pub fn check_within(&self, total: i64) -> AppResult<()> {
        if self.skip > 0 && self.skip >= total {
            return Err(AppError::BadRequest(format!(
                "Skip {} is greater than or equal to the total number of records ({})",
                self.skip, total
            )));
        }
        Ok(())
    }

    /// Apply the window to an already ordered list
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.skip as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Listing parameters for readers
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Number of records to skip (requires `limit`)
    pub skip: Option<i64>,
    /// Number of records to return
    pub limit: Option<i64>,
    /// ASC or DESC on the identifier
    pub order_by: Option<SortOrder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_without_limit_is_rejected() {
        assert!(matches!(
            Page::from_parts(Some(5), None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_limit_alone_starts_at_zero() {
        let page = Page::from_parts(None, Some(10)).unwrap();
        assert_eq!(page, Some(Page { skip: 0, limit: 10 }));
        assert_eq!(Page::from_parts(None, None).unwrap(), None);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(Page::from_parts(Some(-1), Some(2)).is_err());
        assert!(Page::from_parts(Some(0), Some(0)).is_err());
    }

    #[test]
    fn test_skip_beyond_total() {
        let page = Page { skip: 50, limit: 10 };
        assert!(matches!(page.check_within(10), Err(AppError::BadRequest(_))));
        assert!(page.check_within(51).is_ok());
        assert!(Page { skip: 0, limit: 5 }.check_within(0).is_ok());
    }

    #[test]
    fn test_slice() {
        let page = Page { skip: 1, limit: 2 };
        assert_eq!(page.slice(vec![1, 2, 3, 4]), vec![2, 3]);
    }
}
