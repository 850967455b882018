//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        pagination::Page,
    },
    repository::BookRepository,
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn where_clause(query: &BookQuery) -> String {
        let mut conditions = Vec::new();
        let mut idx = 1;

        for (value, column) in [
            (&query.title, "title"),
            (&query.author, "author"),
            (&query.genres, "genres"),
        ] {
            if value.is_some() {
                conditions.push(format!("{} ILIKE ${}", column, idx));
                idx += 1;
            }
        }

        if query.publication_range().is_some() {
            conditions.push(format!(
                "publication_date BETWEEN ${} AND ${}",
                idx,
                idx + 1
            ));
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    fn patterns(query: &BookQuery) -> Vec<String> {
        [&query.title, &query.author, &query.genres]
            .into_iter()
            .flatten()
            .map(|v| format!("%{}%", v))
            .collect()
    }
}

#[async_trait]
impl BookRepository for BooksRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list(&self, query: &BookQuery, page: Option<Page>) -> AppResult<Vec<Book>> {
        let mut select_q = format!(
            "SELECT * FROM books {} ORDER BY id {}",
            Self::where_clause(query),
            query.order_by.unwrap_or_default().as_sql()
        );
        if let Some(page) = page {
            select_q.push_str(&format!(" LIMIT {} OFFSET {}", page.limit, page.skip));
        }

        let mut builder = sqlx::query_as::<_, Book>(&select_q);
        for pattern in Self::patterns(query) {
            builder = builder.bind(pattern);
        }
        if let Some((first, last)) = query.publication_range() {
            builder = builder.bind(first).bind(last);
        }
        Ok(builder.fetch_all(&self.pool).await?)
    }

    async fn count(&self, query: &BookQuery) -> AppResult<i64> {
        let count_q = format!("SELECT COUNT(*) FROM books {}", Self::where_clause(query));
        let mut builder = sqlx::query_scalar::<_, i64>(&count_q);
        for pattern in Self::patterns(query) {
            builder = builder.bind(pattern);
        }
        if let Some((first, last)) = query.publication_range() {
            builder = builder.bind(first).bind(last);
        }
        Ok(builder.fetch_one(&self.pool).await?)
    }

    async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, genres, synopsis, publication_date, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.genres)
        .bind(&data.synopsis)
        .bind(data.publication_date)
        .bind(data.stock)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($1, title),
                author = COALESCE($2, author),
                genres = COALESCE($3, genres),
                synopsis = COALESCE($4, synopsis),
                publication_date = COALESCE($5, publication_date),
                stock = COALESCE($6, stock)
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.genres)
        .bind(&data.synopsis)
        .bind(data.publication_date)
        .bind(data.stock)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_where_clause_numbers_placeholders() {
        let query = BookQuery {
            title: Some("casmurro".to_string()),
            genres: Some("novel".to_string()),
            ..Default::default()
        };
        assert_eq!(
            BooksRepository::where_clause(&query),
            "WHERE title ILIKE $1 AND genres ILIKE $2"
        );
        assert_eq!(
            BooksRepository::patterns(&query),
            vec!["%casmurro%".to_string(), "%novel%".to_string()]
        );
        assert_eq!(BooksRepository::where_clause(&BookQuery::default()), "");
    }

    #[test]
    fn test_where_clause_with_publication_range() {
        let query = BookQuery {
            author: Some("machado".to_string()),
            first_date: NaiveDate::from_ymd_opt(1881, 1, 1),
            last_date: NaiveDate::from_ymd_opt(1899, 12, 31),
            ..Default::default()
        };
        assert_eq!(
            BooksRepository::where_clause(&query),
            "WHERE author ILIKE $1 AND publication_date BETWEEN $2 AND $3"
        );
    }
}
