//! Repository layer: storage traits and their implementations
//!
//! Services only see the traits below. `postgres` backs them with sqlx,
//! `memory` with a process-local store.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookLoanCount, BookQuery, CreateBook, UpdateBook},
        loan::{Loan, LoanDetails, LoanFilter, NewLoan},
        pagination::{Page, SortOrder},
        reader::{CreateReader, Reader, ReaderKey, UpdateReader},
        staff::{NewStaff, Staff, StaffChanges},
    },
};

#[async_trait]
pub trait ReaderRepository: Send + Sync {
    async fn find_by(&self, key: &ReaderKey) -> AppResult<Option<Reader>>;
    async fn list(&self, page: Option<Page>, order: SortOrder) -> AppResult<Vec<Reader>>;
    async fn count(&self) -> AppResult<i64>;
    async fn create(&self, data: &CreateReader) -> AppResult<Reader>;
    /// Returns `None` when the reader does not exist
    async fn update(&self, id: i32, data: &UpdateReader) -> AppResult<Option<Reader>>;
    /// Returns `false` when nothing was deleted. Loans of the reader go with it.
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>>;
    async fn list(&self, query: &BookQuery, page: Option<Page>) -> AppResult<Vec<Book>>;
    async fn count(&self, query: &BookQuery) -> AppResult<i64>;
    async fn create(&self, data: &CreateBook) -> AppResult<Book>;
    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Option<Book>>;
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Staff>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>>;
    async fn list(&self) -> AppResult<Vec<Staff>>;
    /// Fails with `Conflict` when the email is taken
    async fn create(&self, data: &NewStaff) -> AppResult<Staff>;
    async fn update(&self, id: i32, changes: &StaffChanges) -> AppResult<Option<Staff>>;
}

/// Loan reads and single-row writes against the ambient connection
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<LoanDetails>>;
    async fn find(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>>;
    /// Number of loans matching the filter predicates, pagination ignored
    async fn count(&self, filter: &LoanFilter) -> AppResult<i64>;
    async fn count_active_for_reader(&self, reader_id: i32) -> AppResult<i64>;
    async fn count_active_for_book(&self, book_id: i32) -> AppResult<i64>;
    async fn active_for_reader(&self, reader_id: i32) -> AppResult<Vec<LoanDetails>>;
    /// Flip an active loan to returned. `None` if the loan is missing or already returned.
    async fn mark_returned(&self, id: i32, at: DateTime<Utc>) -> AppResult<Option<Loan>>;
    async fn delete(&self, id: i32) -> AppResult<bool>;
    /// Books by historical loan count, most borrowed first, ties by book id
    async fn top_books(&self, limit: i64) -> AppResult<Vec<BookLoanCount>>;
}

/// Opens units of work for loan creation
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn LoanTransaction>>;
}

/// A unit of work. Reads see the writes made earlier in the same unit.
///
/// `commit` and `rollback` consume the handle; dropping it unfinished rolls back.
#[async_trait]
pub trait LoanTransaction: Send {
    /// Lock the reader row until the unit ends
    async fn lock_reader(&mut self, reader_id: i32) -> AppResult<Option<Reader>>;
    /// Lock the book rows until the unit ends, in ascending id order.
    /// Ids with no row are left out of the result.
    async fn lock_books(&mut self, book_ids: &[i32]) -> AppResult<Vec<Book>>;
    async fn count_active_for_reader(&mut self, reader_id: i32) -> AppResult<i64>;
    async fn count_active_for_book(&mut self, book_id: i32) -> AppResult<i64>;
    async fn has_active_loan(&mut self, reader_id: i32, book_id: i32) -> AppResult<bool>;
    async fn insert(&mut self, loan: &NewLoan) -> AppResult<Loan>;
    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Main repository struct holding every store
#[derive(Clone)]
pub struct Repository {
    pub readers: Arc<dyn ReaderRepository>,
    pub books: Arc<dyn BookRepository>,
    pub loans: Arc<dyn LoanRepository>,
    pub staff: Arc<dyn StaffRepository>,
    pub transactions: Arc<dyn TransactionManager>,
}

impl Repository {
    /// Repository over a PostgreSQL pool
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = postgres::PostgresStore::new(pool);
        Self {
            readers: Arc::new(store.readers()),
            books: Arc::new(store.books()),
            loans: Arc::new(store.loans()),
            staff: Arc::new(store.staff()),
            transactions: Arc::new(store),
        }
    }

    /// Repository over a fresh in-memory store
    pub fn memory() -> Self {
        Self::from_memory(memory::MemoryStore::new())
    }

    pub fn from_memory(store: memory::MemoryStore) -> Self {
        Self {
            readers: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            loans: Arc::new(store.clone()),
            staff: Arc::new(store.clone()),
            transactions: Arc::new(store),
        }
    }
}
