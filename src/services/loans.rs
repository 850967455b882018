//! Loan management service
//!
//! Batches of loans are created inside one unit of work: availability,
//! duplicate checks and inserts for every book of the batch either all
//! commit or all roll back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    clock::Clock,
    fines::{due_date, fine_at},
};
use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookAvailability, BookLoanCount},
        loan::{
            CreateLoans, Loan, LoanDetails, LoanQuery, NewLoan, PendingLoan, PendingLoans,
            ReturnedLoan,
        },
        pagination::Page,
        reader::{Reader, ReaderKey},
    },
    repository::{LoanTransaction, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    policy: LoansConfig,
    clock: Arc<dyn Clock>,
}

impl LoansService {
    pub fn new(repository: Repository, policy: LoansConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// Copies of a book that are not currently lent
    pub async fn availability(&self, book_id: i32) -> AppResult<BookAvailability> {
        let book = self
            .repository
            .books
            .get_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::book_not_found(book_id))?;
        let active = self.repository.loans.count_active_for_book(book_id).await?;

        Ok(BookAvailability {
            available: i64::from(book.stock) - active,
            book,
        })
    }

    fn check_cap(&self, reader: &Reader, active: i64, requested: usize) -> AppResult<()> {
        if active + requested as i64 > self.policy.max_active_loans {
            return Err(AppError::max_loans_reached(
                &reader.name,
                active,
                self.policy.max_active_loans,
            ));
        }
        Ok(())
    }

    /// Lend a batch of books to the reader identified by CPF.
    ///
    /// Returns the created loans in request order, or nothing at all.
    pub async fn create_loans(&self, request: CreateLoans) -> AppResult<Vec<Loan>> {
        request.check()?;

        let reader = self
            .repository
            .readers
            .find_by(&ReaderKey::Cpf(request.reader_cpf.clone()))
            .await?
            .ok_or_else(AppError::reader_not_found)?;

        // A book may appear only once per batch
        if let Some(book_id) = request.repeated_book() {
            return Err(AppError::duplicate_loan(book_id));
        }

        let active = self
            .repository
            .loans
            .count_active_for_reader(reader.id)
            .await?;
        self.check_cap(&reader, active, request.book_ids.len())?;

        let loan_date = self.clock.now();
        let limit_return_date = due_date(loan_date, self.policy.loan_duration_days);

        let mut tx = self.repository.transactions.begin().await?;
        let outcome = self
            .lend_batch(
                tx.as_mut(),
                &reader,
                &request.book_ids,
                loan_date,
                limit_return_date,
            )
            .await;

        match outcome {
            Ok(loans) => {
                tx.commit().await?;
                tracing::info!(
                    reader_id = reader.id,
                    count = loans.len(),
                    "Loans created"
                );
                Ok(loans)
            }
            Err(err) => {
                tracing::warn!(reader_id = reader.id, "Loan batch rolled back: {}", err);
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("Rollback of loan batch failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn lend_batch(
        &self,
        tx: &mut dyn LoanTransaction,
        reader: &Reader,
        book_ids: &[i32],
        loan_date: DateTime<Utc>,
        limit_return_date: DateTime<Utc>,
    ) -> AppResult<Vec<Loan>> {
        // Concurrent batches of the same reader queue up here
        tx.lock_reader(reader.id)
            .await?
            .ok_or_else(AppError::reader_not_found)?;
        let active = tx.count_active_for_reader(reader.id).await?;
        self.check_cap(reader, active, book_ids.len())?;

        // Every book row is locked up front, lowest id first, whatever the
        // request order
        let locked: HashMap<i32, Book> = tx
            .lock_books(&lock_order(book_ids))
            .await?
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        let mut loans = Vec::with_capacity(book_ids.len());
        for &book_id in book_ids {
            let book = locked
                .get(&book_id)
                .ok_or_else(|| AppError::book_not_found(book_id))?;
            let active = tx.count_active_for_book(book_id).await?;
            if i64::from(book.stock) - active <= 0 {
                return Err(AppError::out_of_stock(book_id));
            }

            if tx.has_active_loan(reader.id, book_id).await? {
                return Err(AppError::duplicate_loan(book_id));
            }

            let loan = tx
                .insert(&NewLoan {
                    reader_id: reader.id,
                    book_id,
                    loan_date,
                    limit_return_date,
                })
                .await?;
            loans.push(loan);
        }

        Ok(loans)
    }

    /// Get loan by ID, with reader and book
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        self.repository
            .loans
            .get_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::loan_not_found(loan_id))
    }

    /// Filtered, ordered and optionally paginated loans, with the number
    /// of matches before pagination
    pub async fn find(
        &self,
        query: LoanQuery,
    ) -> AppResult<(Vec<LoanDetails>, Option<Page>, i64)> {
        let filter = query.into_filter()?;

        let total = self.repository.loans.count(&filter.without_page()).await?;
        if let Some(page) = filter.page {
            page.check_within(total)?;
        }

        let loans = self.repository.loans.find(&filter).await?;
        Ok((loans, filter.page, total))
    }

    /// Current fine of an active loan
    pub async fn fine(&self, loan_id: i32) -> AppResult<i64> {
        let loan = self.get_loan(loan_id).await?;
        if loan.returned {
            return Err(AppError::already_returned(loan_id));
        }
        Ok(fine_at(loan.limit_return_date, self.clock.now()))
    }

    /// Close a loan; the fine is computed once, at this moment
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<ReturnedLoan> {
        let details = self.get_loan(loan_id).await?;
        if details.returned {
            return Err(AppError::already_returned(loan_id));
        }

        let now = self.clock.now();
        let fine = fine_at(details.limit_return_date, now);

        let Some(updated) = self.repository.loans.mark_returned(loan_id, now).await? else {
            // Someone else got there between the read and the update
            self.get_loan(loan_id).await?;
            return Err(AppError::already_returned(loan_id));
        };

        tracing::info!(loan_id, fine, "Loan returned");

        Ok(ReturnedLoan {
            loan: LoanDetails {
                returned: updated.returned,
                returned_date: updated.returned_date,
                ..details
            },
            fine,
        })
    }

    /// Active loans of a reader with their current fines
    pub async fn pending(&self, reader_id: i32) -> AppResult<PendingLoans> {
        self.repository
            .readers
            .find_by(&ReaderKey::Id(reader_id))
            .await?
            .ok_or_else(AppError::reader_not_found)?;

        let now = self.clock.now();
        let loans: Vec<PendingLoan> = self
            .repository
            .loans
            .active_for_reader(reader_id)
            .await?
            .into_iter()
            .map(|loan| PendingLoan {
                fine: fine_at(loan.limit_return_date, now),
                loan,
            })
            .collect();
        let total_fines = loans.iter().map(|l| l.fine).sum();

        Ok(PendingLoans { loans, total_fines })
    }

    /// Hard delete, whatever the loan state
    pub async fn delete_loan(&self, loan_id: i32) -> AppResult<()> {
        if !self.repository.loans.delete(loan_id).await? {
            return Err(AppError::loan_not_found(loan_id));
        }
        tracing::info!(loan_id, "Loan deleted");
        Ok(())
    }

    /// Most borrowed books over the whole loan history
    pub async fn top_books(&self) -> AppResult<Vec<BookLoanCount>> {
        self.repository
            .loans
            .top_books(self.policy.top_books_limit)
            .await
    }
}

/// Distinct ids, ascending
fn lock_order(book_ids: &[i32]) -> Vec<i32> {
    let mut ids = book_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
