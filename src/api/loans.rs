//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        book::{BookAvailability, BookLoanCount},
        loan::{CreateLoans, Loan, LoanDetails, LoanQuery, PendingLoans, ReturnedLoan},
    },
    AppState,
};

use super::{ApiResponse, AuthenticatedStaff};

/// Fine accrued so far by an active loan
#[derive(Serialize, ToSchema)]
pub struct LoanFine {
    pub loan_id: i32,
    /// Whole days past the return deadline
    pub fine: i64,
}

/// Lend one or more books to a reader
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoans,
    responses(
        (status = 201, description = "Every loan of the batch was created", body = Vec<Loan>),
        (status = 400, description = "Loan limit reached, book out of stock or already held"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Reader or book not found")
    )
)]
pub async fn create_loans(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Json(request): Json<CreateLoans>,
) -> AppResult<(StatusCode, Json<ApiResponse<Vec<Loan>>>)> {
    let loans = state.services.loans.create_loans(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(loans))))
}

/// Search loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Matching loans with reader and book", body = Vec<LoanDetails>),
        (status = 400, description = "Inconsistent filter or pagination parameters")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<ApiResponse<Vec<LoanDetails>>>> {
    let (loans, page, total) = state.services.loans.find(query).await?;
    Ok(Json(ApiResponse::page(loans, page, Some(total))))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan with reader and book", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ApiResponse<LoanDetails>>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(ApiResponse::new(loan)))
}

/// Current fine of an active loan
#[utoipa::path(
    get,
    path = "/loans/{id}/fine",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Fine in whole days", body = LoanFine),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn loan_fine(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ApiResponse<LoanFine>>> {
    let fine = state.services.loans.fine(loan_id).await?;
    Ok(Json(ApiResponse::new(LoanFine { loan_id, fine })))
}

/// Return a borrowed book
#[utoipa::path(
    patch,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan closed, with the fine due", body = ReturnedLoan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ApiResponse<ReturnedLoan>>> {
    let returned = state.services.loans.return_loan(loan_id).await?;
    Ok(Json(ApiResponse::new(returned)))
}

/// Delete a loan record
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 403, description = "Administrator rights required"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    AuthenticatedStaff(claims): AuthenticatedStaff,
    Path(loan_id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.loans.delete_loan(loan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Outstanding loans of a reader and the fines they carry
#[utoipa::path(
    get,
    path = "/loans/pending/{reader_id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("reader_id" = i32, Path, description = "Reader ID")
    ),
    responses(
        (status = 200, description = "Active loans with fines", body = PendingLoans),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn pending_loans(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Path(reader_id): Path<i32>,
) -> AppResult<Json<ApiResponse<PendingLoans>>> {
    let pending = state.services.loans.pending(reader_id).await?;
    Ok(Json(ApiResponse::new(pending)))
}

/// Copies of a book on the shelf
#[utoipa::path(
    get,
    path = "/loans/books/{book_id}/availability",
    tag = "loans",
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Stock minus active loans", body = BookAvailability),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_availability(
    State(state): State<AppState>,
    Path(book_id): Path<i32>,
) -> AppResult<Json<ApiResponse<BookAvailability>>> {
    let availability = state.services.loans.availability(book_id).await?;
    Ok(Json(ApiResponse::new(availability)))
}

/// Most borrowed books
#[utoipa::path(
    get,
    path = "/loans/top-books",
    tag = "loans",
    responses(
        (status = 200, description = "Books by loan count, most borrowed first", body = Vec<BookLoanCount>)
    )
)]
pub async fn top_books(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<BookLoanCount>>>> {
    let ranking = state.services.loans.top_books().await?;
    let total = ranking.len() as i64;
    Ok(Json(ApiResponse::page(ranking, None, Some(total))))
}
