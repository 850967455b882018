//! PostgreSQL implementation of the repository traits

mod books;
mod loans;
mod readers;
mod staff;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use super::{LoanTransaction, TransactionManager};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        loan::{Loan, NewLoan},
        reader::Reader,
    },
};

pub use books::BooksRepository;
pub use loans::LoansRepository;
pub use readers::ReadersRepository;
pub use staff::StaffAccountsRepository;

/// Entry point holding the connection pool
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn readers(&self) -> ReadersRepository {
        ReadersRepository::new(self.pool.clone())
    }

    pub fn books(&self) -> BooksRepository {
        BooksRepository::new(self.pool.clone())
    }

    pub fn loans(&self) -> LoansRepository {
        LoansRepository::new(self.pool.clone())
    }

    pub fn staff(&self) -> StaffAccountsRepository {
        StaffAccountsRepository::new(self.pool.clone())
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl TransactionManager for PostgresStore {
    async fn begin(&self) -> AppResult<Box<dyn LoanTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLoanTransaction { tx }))
    }
}

// Rows are locked in the order they are returned
const LOCK_BOOKS: &str = "SELECT * FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE";

/// READ COMMITTED transaction; rows read through `lock_*` stay locked until it ends
pub struct PgLoanTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LoanTransaction for PgLoanTransaction {
    async fn lock_reader(&mut self, reader_id: i32) -> AppResult<Option<Reader>> {
        let reader = sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1 FOR UPDATE")
            .bind(reader_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(reader)
    }

    async fn lock_books(&mut self, book_ids: &[i32]) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(LOCK_BOOKS)
            .bind(book_ids)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(books)
    }

    async fn count_active_for_reader(&mut self, reader_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE reader_id = $1 AND returned = FALSE",
        )
        .bind(reader_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn count_active_for_book(&mut self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND returned = FALSE",
        )
        .bind(book_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn has_active_loan(&mut self, reader_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE reader_id = $1 AND book_id = $2 AND returned = FALSE)",
        )
        .bind(reader_id)
        .bind(book_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert(&mut self, loan: &NewLoan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (loan_date, limit_return_date, returned_date, returned, reader_id, book_id)
            VALUES ($1, $2, NULL, FALSE, $3, $4)
            RETURNING *
            "#,
        )
        .bind(loan.loan_date)
        .bind(loan.limit_return_date)
        .bind(loan.reader_id)
        .bind(loan.book_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::duplicate_loan(loan.book_id)
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
