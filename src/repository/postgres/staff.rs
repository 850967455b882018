//! Staff accounts repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::is_unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::staff::{NewStaff, Staff, StaffChanges},
    repository::StaffRepository,
};

#[derive(Clone)]
pub struct StaffAccountsRepository {
    pool: Pool<Postgres>,
}

impl StaffAccountsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn email_taken(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("The email is already registered".to_string())
    } else {
        AppError::Database(err)
    }
}

#[async_trait]
impl StaffRepository for StaffAccountsRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn list(&self) -> AppResult<Vec<Staff>> {
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn create(&self, data: &NewStaff) -> AppResult<Staff> {
        sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO staff (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(data.role)
        .fetch_one(&self.pool)
        .await
        .map_err(email_taken)
    }

    async fn update(&self, id: i32, changes: &StaffChanges) -> AppResult<Option<Staff>> {
        sqlx::query_as::<_, Staff>(
            r#"
            UPDATE staff
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(email_taken)
    }
}
