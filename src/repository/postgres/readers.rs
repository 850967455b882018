//! Readers repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::is_unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::{Page, SortOrder},
        reader::{CreateReader, Reader, ReaderKey, UpdateReader},
    },
    repository::ReaderRepository,
};

#[derive(Clone)]
pub struct ReadersRepository {
    pool: Pool<Postgres>,
}

impl ReadersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReaderRepository for ReadersRepository {
    async fn find_by(&self, key: &ReaderKey) -> AppResult<Option<Reader>> {
        let query = format!("SELECT * FROM readers WHERE {} = $1", key.column());
        let builder = sqlx::query_as::<_, Reader>(&query);
        let builder = match key {
            ReaderKey::Id(id) => builder.bind(*id),
            ReaderKey::Cpf(cpf) => builder.bind(cpf.clone()),
            ReaderKey::Email(email) => builder.bind(email.clone()),
        };
        Ok(builder.fetch_optional(&self.pool).await?)
    }

    async fn list(&self, page: Option<Page>, order: SortOrder) -> AppResult<Vec<Reader>> {
        let mut query = format!("SELECT * FROM readers ORDER BY id {}", order.as_sql());
        if let Some(page) = page {
            query.push_str(&format!(" LIMIT {} OFFSET {}", page.limit, page.skip));
        }
        let readers = sqlx::query_as::<_, Reader>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(readers)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, data: &CreateReader) -> AppResult<Reader> {
        sqlx::query_as::<_, Reader>(
            "INSERT INTO readers (name, email, cpf) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.cpf)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A reader with this email or CPF already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn update(&self, id: i32, data: &UpdateReader) -> AppResult<Option<Reader>> {
        sqlx::query_as::<_, Reader>(
            r#"
            UPDATE readers
            SET name = COALESCE($1, name),
                email = COALESCE($2, email)
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&data.new_name)
        .bind(&data.new_email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("The email is already registered".to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM readers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
