//! Book model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::pagination::SortOrder;
use crate::error::{AppError, AppResult};

/// Book model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// Genre tags, free text
    pub genres: String,
    pub synopsis: String,
    pub publication_date: NaiveDate,
    /// Copies owned by the library
    pub stock: i32,
}

impl Book {
    /// Merge the fields present in `update`, leaving absent ones untouched
    pub fn apply(&mut self, update: &UpdateBook) {
        if let Some(ref title) = update.title {
            self.title = title.clone();
        }
        if let Some(ref author) = update.author {
            self.author = author.clone();
        }
        if let Some(ref genres) = update.genres {
            self.genres = genres.clone();
        }
        if let Some(ref synopsis) = update.synopsis {
            self.synopsis = synopsis.clone();
        }
        if let Some(date) = update.publication_date {
            self.publication_date = date;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    pub genres: String,
    pub synopsis: String,
    pub publication_date: NaiveDate,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: i32,
}

/// Update book request; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: Option<String>,
    pub genres: Option<String>,
    pub synopsis: Option<String>,
    pub publication_date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: Option<i32>,
}

/// Query parameters for books
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Substring of the title
    pub title: Option<String>,
    /// Substring of the author
    pub author: Option<String>,
    /// Substring of the genre tags
    pub genres: Option<String>,
    /// Earliest publication date, inclusive (requires `last_date`)
    pub first_date: Option<NaiveDate>,
    /// Latest publication date, inclusive (requires `first_date`)
    pub last_date: Option<NaiveDate>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub order_by: Option<SortOrder>,
}

impl BookQuery {
    /// Publication dates must be given together and in order
    pub fn check_dates(&self) -> AppResult<()> {
        match (self.first_date, self.last_date) {
            (None, None) => Ok(()),
            (Some(first), Some(last)) if first > last => Err(AppError::BadRequest(
                "\"first_date\" must not be after \"last_date\"".to_string(),
            )),
            (Some(_), Some(_)) => Ok(()),
            _ => Err(AppError::BadRequest(
                "\"first_date\" and \"last_date\" must be used together".to_string(),
            )),
        }
    }

    /// Publication range, when both bounds are set
    pub fn publication_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.first_date.zip(self.last_date)
    }

    pub fn matches(&self, book: &Book) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .map(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
                .unwrap_or(true)
        }
        contains(&book.title, &self.title)
            && contains(&book.author, &self.author)
            && contains(&book.genres, &self.genres)
            && self.publication_range().map_or(true, |(first, last)| {
                book.publication_date >= first && book.publication_date <= last
            })
    }
}

/// Units of a book currently on the shelf
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookAvailability {
    pub book: Book,
    /// `stock` minus active loans
    pub available: i64,
}

/// Entry of the popularity ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct BookLoanCount {
    pub book_id: i32,
    pub title: String,
    pub total_loans: i64,
}
