//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookLoanCount},
        loan::{Loan, LoanDetails, LoanFilter},
        reader::Reader,
    },
    repository::LoanRepository,
};

const SELECT_DETAILS: &str = r#"
    SELECT l.id, l.loan_date, l.limit_return_date, l.returned_date, l.returned,
           r.id AS reader_id, r.name AS reader_name, r.email AS reader_email, r.cpf AS reader_cpf,
           b.id AS book_id, b.title, b.author, b.genres, b.synopsis, b.publication_date, b.stock
    FROM loans l
    JOIN readers r ON r.id = l.reader_id
    JOIN books b ON b.id = l.book_id
"#;

/// Bind the filter values in the order `where_clause` numbers them
macro_rules! bind_filter {
    ($builder:expr, $filter:expr) => {{
        let mut builder = $builder;
        if let Some(id) = $filter.reader_id {
            builder = builder.bind(id);
        }
        if let Some(id) = $filter.book_id {
            builder = builder.bind(id);
        }
        if let Some(returned) = $filter.returned {
            builder = builder.bind(returned);
        }
        if let Some(range) = $filter.date_range {
            builder = builder.bind(range.first).bind(range.last);
        }
        builder
    }};
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn where_clause(filter: &LoanFilter) -> String {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.reader_id.is_some() {
            conditions.push(format!("l.reader_id = ${}", idx));
            idx += 1;
        }
        if filter.book_id.is_some() {
            conditions.push(format!("l.book_id = ${}", idx));
            idx += 1;
        }
        if filter.returned.is_some() {
            conditions.push(format!("l.returned = ${}", idx));
            idx += 1;
        }
        if let Some(range) = filter.date_range {
            conditions.push(format!(
                "l.{} BETWEEN ${} AND ${}",
                range.field.column(),
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

    fn details_from_row(row: &PgRow) -> Result<LoanDetails, sqlx::Error> {
        let loan = Loan {
            id: row.try_get("id")?,
            loan_date: row.try_get("loan_date")?,
            limit_return_date: row.try_get("limit_return_date")?,
            returned_date: row.try_get("returned_date")?,
            returned: row.try_get("returned")?,
            reader_id: row.try_get("reader_id")?,
            book_id: row.try_get("book_id")?,
        };
        let reader = Reader {
            id: loan.reader_id,
            name: row.try_get("reader_name")?,
            email: row.try_get("reader_email")?,
            cpf: row.try_get("reader_cpf")?,
        };
        let book = Book {
            id: loan.book_id,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            genres: row.try_get("genres")?,
            synopsis: row.try_get("synopsis")?,
            publication_date: row.try_get("publication_date")?,
            stock: row.try_get("stock")?,
        };
        Ok(LoanDetails::new(loan, reader, book))
    }
}

#[async_trait]
impl LoanRepository for LoansRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let query = format!("{} WHERE l.id = $1", SELECT_DETAILS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::details_from_row).transpose()?)
    }

    async fn find(&self, filter: &LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let mut select_q = format!(
            "{} {} ORDER BY l.id {}",
            SELECT_DETAILS,
            Self::where_clause(filter),
            filter.order.as_sql()
        );
        if let Some(page) = filter.page {
            select_q.push_str(&format!(" LIMIT {} OFFSET {}", page.limit, page.skip));
        }

        let rows = bind_filter!(sqlx::query(&select_q), filter)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(Self::details_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count(&self, filter: &LoanFilter) -> AppResult<i64> {
        let count_q = format!("SELECT COUNT(*) FROM loans l {}", Self::where_clause(filter));
        let total = bind_filter!(sqlx::query_scalar::<_, i64>(&count_q), filter)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn count_active_for_reader(&self, reader_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE reader_id = $1 AND returned = FALSE",
        )
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_active_for_book(&self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND returned = FALSE",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn active_for_reader(&self, reader_id: i32) -> AppResult<Vec<LoanDetails>> {
        let query = format!(
            "{} WHERE l.reader_id = $1 AND l.returned = FALSE ORDER BY l.limit_return_date, l.id",
            SELECT_DETAILS
        );
        let rows = sqlx::query(&query)
            .bind(reader_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(Self::details_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn mark_returned(&self, id: i32, at: DateTime<Utc>) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET returned = TRUE, returned_date = $1
            WHERE id = $2 AND returned = FALSE
            RETURNING *
            "#,
        )
        .bind(at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn top_books(&self, limit: i64) -> AppResult<Vec<BookLoanCount>> {
        let ranking = sqlx::query_as::<_, BookLoanCount>(
            r#"
            SELECT b.id AS book_id, b.title, COUNT(l.id) AS total_loans
            FROM loans l
            JOIN books b ON b.id = l.book_id
            GROUP BY b.id, b.title
            ORDER BY total_loans DESC, b.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(ranking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loan::{DateRange, LoanDateField};

    #[test]
    fn test_where_clause_numbers_placeholders() {
        let now = Utc::now();
        let filter = LoanFilter {
            book_id: Some(3),
            returned: Some(false),
            date_range: Some(DateRange {
                field: LoanDateField::ReturnedDate,
                first: now,
                last: now,
            }),
            ..Default::default()
        };
        assert_eq!(
            LoansRepository::where_clause(&filter),
            "WHERE l.book_id = $1 AND l.returned = $2 AND l.returned_date BETWEEN $3 AND $4"
        );
        assert_eq!(LoansRepository::where_clause(&LoanFilter::default()), "");
    }
}
