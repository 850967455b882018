//! Book catalog service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        pagination::Page,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let book = self.repository.books.create(&data).await?;
        tracing::info!(book_id = book.id, "Book created");
        Ok(book)
    }

    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.repository
            .books
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::book_not_found(id))
    }

    /// Search books, returning the window that was applied and the matching total
    pub async fn list(&self, query: BookQuery) -> AppResult<(Vec<Book>, Option<Page>, i64)> {
        query.check_dates()?;
        let page = Page::from_parts(query.skip, query.limit)?;
        let total = self.repository.books.count(&query).await?;
        if let Some(page) = page {
            page.check_within(total)?;
        }

        let books = self.repository.books.list(&query, page).await?;
        Ok((books, page, total))
    }

    pub async fn update(&self, id: i32, data: UpdateBook) -> AppResult<Book> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if let Some(stock) = data.stock {
            let active = self.repository.loans.count_active_for_book(id).await?;
            if i64::from(stock) < active {
                return Err(AppError::BadRequest(format!(
                    "Stock cannot drop below the {} copies currently on loan",
                    active
                )));
            }
        }
        self.repository
            .books
            .update(id, &data)
            .await?
            .ok_or_else(|| AppError::book_not_found(id))
    }

    /// Delete a book together with its loans
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        if !self.repository.books.delete(id).await? {
            return Err(AppError::book_not_found(id));
        }
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
