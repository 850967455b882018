//! In-memory store
//!
//! One mutex guards the whole store. A transaction holds it from `begin`
//! until commit or rollback and works on a copy, so units of work are
//! serialized and a rollback simply drops the copy.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    BookRepository, LoanRepository, LoanTransaction, ReaderRepository, StaffRepository,
    TransactionManager,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookLoanCount, BookQuery, CreateBook, UpdateBook},
        loan::{Loan, LoanDetails, LoanFilter, NewLoan},
        pagination::{Page, SortOrder},
        reader::{CreateReader, Reader, ReaderKey, UpdateReader},
        staff::{NewStaff, Staff, StaffChanges},
    },
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    readers: BTreeMap<i32, Reader>,
    books: BTreeMap<i32, Book>,
    loans: BTreeMap<i32, Loan>,
    staff: BTreeMap<i32, Staff>,
    last_reader_id: i32,
    last_book_id: i32,
    last_loan_id: i32,
    last_staff_id: i32,
}

impl MemoryState {
    fn details(&self, loan: &Loan) -> Option<LoanDetails> {
        let reader = self.readers.get(&loan.reader_id)?;
        let book = self.books.get(&loan.book_id)?;
        Some(LoanDetails::new(loan.clone(), reader.clone(), book.clone()))
    }

    fn count_active(&self, pred: impl Fn(&Loan) -> bool) -> i64 {
        self.loans
            .values()
            .filter(|l| l.is_active() && pred(l))
            .count() as i64
    }

    fn ordered<T: Clone>(map: &BTreeMap<i32, T>, order: SortOrder) -> Vec<T> {
        match order {
            SortOrder::Asc => map.values().cloned().collect(),
            SortOrder::Desc => map.values().rev().cloned().collect(),
        }
    }

    fn insert_loan(&mut self, new: &NewLoan) -> AppResult<Loan> {
        if !self.readers.contains_key(&new.reader_id) {
            return Err(AppError::reader_not_found());
        }
        if !self.books.contains_key(&new.book_id) {
            return Err(AppError::book_not_found(new.book_id));
        }
        self.last_loan_id += 1;
        let loan = Loan {
            id: self.last_loan_id,
            loan_date: new.loan_date,
            limit_return_date: new.limit_return_date,
            returned_date: None,
            returned: false,
            reader_id: new.reader_id,
            book_id: new.book_id,
        };
        self.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }
}

/// Process-local store implementing every repository trait
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReaderRepository for MemoryStore {
    async fn find_by(&self, key: &ReaderKey) -> AppResult<Option<Reader>> {
        let state = self.state.lock().await;
        Ok(state.readers.values().find(|r| key.matches(r)).cloned())
    }

    async fn list(&self, page: Option<Page>, order: SortOrder) -> AppResult<Vec<Reader>> {
        let state = self.state.lock().await;
        let readers = MemoryState::ordered(&state.readers, order);
        Ok(match page {
            Some(page) => page.slice(readers),
            None => readers,
        })
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.lock().await.readers.len() as i64)
    }

    async fn create(&self, data: &CreateReader) -> AppResult<Reader> {
        let mut state = self.state.lock().await;
        if state
            .readers
            .values()
            .any(|r| r.email == data.email || r.cpf == data.cpf)
        {
            return Err(AppError::Conflict(
                "A reader with this email or CPF already exists".to_string(),
            ));
        }
        state.last_reader_id += 1;
        let reader = Reader {
            id: state.last_reader_id,
            name: data.name.clone(),
            email: data.email.clone(),
            cpf: data.cpf.clone(),
        };
        state.readers.insert(reader.id, reader.clone());
        Ok(reader)
    }

    async fn update(&self, id: i32, data: &UpdateReader) -> AppResult<Option<Reader>> {
        let mut state = self.state.lock().await;
        if let Some(ref email) = data.new_email {
            if state.readers.values().any(|r| r.id != id && r.email == *email) {
                return Err(AppError::Conflict(format!(
                    "The email {} is already registered",
                    email
                )));
            }
        }
        Ok(state.readers.get_mut(&id).map(|reader| {
            reader.apply(data);
            reader.clone()
        }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.readers.remove(&id).is_some();
        if removed {
            state.loans.retain(|_, l| l.reader_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn list(&self, query: &BookQuery, page: Option<Page>) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        let books: Vec<Book> =
            MemoryState::ordered(&state.books, query.order_by.unwrap_or_default())
                .into_iter()
                .filter(|b| query.matches(b))
                .collect();
        Ok(match page {
            Some(page) => page.slice(books),
            None => books,
        })
    }

    async fn count(&self, query: &BookQuery) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.books.values().filter(|b| query.matches(b)).count() as i64)
    }

    async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        state.last_book_id += 1;
        let book = Book {
            id: state.last_book_id,
            title: data.title.clone(),
            author: data.author.clone(),
            genres: data.genres.clone(),
            synopsis: data.synopsis.clone(),
            publication_date: data.publication_date,
            stock: data.stock,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Option<Book>> {
        let mut state = self.state.lock().await;
        Ok(state.books.get_mut(&id).map(|book| {
            book.apply(data);
            book.clone()
        }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.books.remove(&id).is_some();
        if removed {
            state.loans.retain(|_, l| l.book_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let state = self.state.lock().await;
        Ok(state.loans.get(&id).and_then(|l| state.details(l)))
    }

    async fn find(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;
        let loans: Vec<LoanDetails> = MemoryState::ordered(&state.loans, filter.order)
            .iter()
            .filter(|l| filter.matches(l))
            .filter_map(|l| state.details(l))
            .collect();
        Ok(match filter.page {
            Some(page) => page.slice(loans),
            None => loans,
        })
    }

    async fn count(&self, filter: &LoanFilter) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.loans.values().filter(|l| filter.matches(l)).count() as i64)
    }

    async fn count_active_for_reader(&self, reader_id: i32) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.count_active(|l| l.reader_id == reader_id))
    }

    async fn count_active_for_book(&self, book_id: i32) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.count_active(|l| l.book_id == book_id))
    }

    async fn active_for_reader(&self, reader_id: i32) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;
        let mut active: Vec<&Loan> = state
            .loans
            .values()
            .filter(|l| l.reader_id == reader_id && l.is_active())
            .collect();
        active.sort_by_key(|l| (l.limit_return_date, l.id));
        Ok(active.into_iter().filter_map(|l| state.details(l)).collect())
    }

    async fn mark_returned(&self, id: i32, at: DateTime<Utc>) -> AppResult<Option<Loan>> {
        let mut state = self.state.lock().await;
        match state.loans.get_mut(&id) {
            Some(loan) if loan.is_active() => {
                loan.mark_returned(at)?;
                Ok(Some(loan.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.state.lock().await.loans.remove(&id).is_some())
    }

    async fn top_books(&self, limit: i64) -> AppResult<Vec<BookLoanCount>> {
        let state = self.state.lock().await;
        let mut counts: BTreeMap<i32, i64> = BTreeMap::new();
        for loan in state.loans.values() {
            *counts.entry(loan.book_id).or_default() += 1;
        }
        let mut ranking: Vec<BookLoanCount> = counts
            .into_iter()
            .filter_map(|(book_id, total_loans)| {
                state.books.get(&book_id).map(|b| BookLoanCount {
                    book_id,
                    title: b.title.clone(),
                    total_loans,
                })
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.total_loans
                .cmp(&a.total_loans)
                .then(a.book_id.cmp(&b.book_id))
        });
        ranking.truncate(limit.max(0) as usize);
        Ok(ranking)
    }
}

#[async_trait]
impl StaffRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Staff>> {
        Ok(self.state.lock().await.staff.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>> {
        let state = self.state.lock().await;
        Ok(state.staff.values().find(|s| s.email == email).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Staff>> {
        Ok(self.state.lock().await.staff.values().cloned().collect())
    }

    async fn create(&self, data: &NewStaff) -> AppResult<Staff> {
        let mut state = self.state.lock().await;
        if state.staff.values().any(|s| s.email == data.email) {
            return Err(AppError::Conflict(format!(
                "The email {} is already registered",
                data.email
            )));
        }
        state.last_staff_id += 1;
        let staff = Staff {
            id: state.last_staff_id,
            name: data.name.clone(),
            email: data.email.clone(),
            password_hash: data.password_hash.clone(),
            role: data.role,
        };
        state.staff.insert(staff.id, staff.clone());
        Ok(staff)
    }

    async fn update(&self, id: i32, changes: &StaffChanges) -> AppResult<Option<Staff>> {
        let mut state = self.state.lock().await;
        if let Some(ref email) = changes.email {
            if state.staff.values().any(|s| s.id != id && s.email == *email) {
                return Err(AppError::Conflict(format!(
                    "The email {} is already registered",
                    email
                )));
            }
        }
        Ok(state.staff.get_mut(&id).map(|staff| {
            staff.apply(changes);
            staff.clone()
        }))
    }
}

#[async_trait]
impl TransactionManager for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn LoanTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Unit of work over a private copy of the store
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl LoanTransaction for MemoryTransaction {
    async fn lock_reader(&mut self, reader_id: i32) -> AppResult<Option<Reader>> {
        Ok(self.working.readers.get(&reader_id).cloned())
    }

    async fn lock_books(&mut self, book_ids: &[i32]) -> AppResult<Vec<Book>> {
        Ok(self
            .working
            .books
            .values()
            .filter(|b| book_ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn count_active_for_reader(&mut self, reader_id: i32) -> AppResult<i64> {
        Ok(self.working.count_active(|l| l.reader_id == reader_id))
    }

    async fn count_active_for_book(&mut self, book_id: i32) -> AppResult<i64> {
        Ok(self.working.count_active(|l| l.book_id == book_id))
    }

    async fn has_active_loan(&mut self, reader_id: i32, book_id: i32) -> AppResult<bool> {
        Ok(self
            .working
            .count_active(|l| l.reader_id == reader_id && l.book_id == book_id)
            > 0)
    }

    async fn insert(&mut self, loan: &NewLoan) -> AppResult<Loan> {
        self.working.insert_loan(loan)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    async fn seeded() -> (MemoryStore, Reader, Book) {
        let store = MemoryStore::new();
        let reader = ReaderRepository::create(
            &store,
            &CreateReader {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                cpf: "12345678901".to_string(),
            },
        )
        .await
        .unwrap();
        let book = BookRepository::create(
            &store,
            &CreateBook {
                title: "Dom Casmurro".to_string(),
                author: "Machado de Assis".to_string(),
                genres: "novel".to_string(),
                synopsis: "Bentinho and Capitu".to_string(),
                publication_date: NaiveDate::from_ymd_opt(1899, 1, 1).unwrap(),
                stock: 2,
            },
        )
        .await
        .unwrap();
        (store, reader, book)
    }

    fn new_loan(reader: &Reader, book: &Book) -> NewLoan {
        let now = Utc::now();
        NewLoan {
            reader_id: reader.id,
            book_id: book.id,
            loan_date: now,
            limit_return_date: now + Duration::days(15),
        }
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let (store, reader, book) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.insert(&new_loan(&reader, &book)).await.unwrap();
        assert!(tx.has_active_loan(reader.id, book.id).await.unwrap());
        tx.rollback().await.unwrap();

        assert_eq!(store.count_active_for_book(book.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let (store, reader, book) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let loan = tx.insert(&new_loan(&reader, &book)).await.unwrap();
        tx.commit().await.unwrap();

        let stored = LoanRepository::get_by_id(&store, loan.id).await.unwrap().unwrap();
        assert_eq!(stored.reader, reader);
        assert_eq!(store.count_active_for_reader(reader.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (store, reader, book) = seeded().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(&new_loan(&reader, &book)).await.unwrap();
        }
        assert_eq!(LoanRepository::count(&store, &LoanFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_returned_only_once() {
        let (store, reader, book) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let loan = tx.insert(&new_loan(&reader, &book)).await.unwrap();
        tx.commit().await.unwrap();

        let at = Utc::now();
        assert!(store.mark_returned(loan.id, at).await.unwrap().is_some());
        assert!(store.mark_returned(loan.id, at).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_book_removes_its_loans() {
        let (store, reader, book) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert(&new_loan(&reader, &book)).await.unwrap();
        tx.commit().await.unwrap();

        assert!(BookRepository::delete(&store, book.id).await.unwrap());
        assert_eq!(LoanRepository::count(&store, &LoanFilter::default()).await.unwrap(), 0);
    }
}
