//! API handlers for Libris REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod readers;
pub mod staff;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{pagination::Page, staff::StaffClaims},
    AppState,
};

/// Extractor for an authenticated staff member from the bearer token.
/// Any valid token carries an admin or employee role.
pub struct AuthenticatedStaff(pub StaffClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Authentication("Invalid authorization header format".to_string())
        })?;

        let claims = StaffClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedStaff(claims))
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    /// Window applied to a listing, when one was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Page>,
    /// Number of records matching a listing, window aside
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            pagination: None,
            total: None,
        }
    }

    pub fn page(data: T, pagination: Option<Page>, total: Option<i64>) -> Self {
        Self {
            data,
            pagination,
            total,
        }
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Loans
        .route("/loans", post(loans::create_loans).get(loans::list_loans))
        .route("/loans/top-books", get(loans::top_books))
        .route("/loans/pending/:reader_id", get(loans::pending_loans))
        .route(
            "/loans/books/:book_id/availability",
            get(loans::book_availability),
        )
        .route("/loans/:id", get(loans::get_loan).delete(loans::delete_loan))
        .route("/loans/:id/fine", get(loans::loan_fine))
        .route("/loans/:id/return", patch(loans::return_loan))
        // Readers
        .route("/readers", post(readers::create_reader).get(readers::list_readers))
        .route(
            "/readers/:id",
            get(readers::get_reader)
                .put(readers::update_reader)
                .delete(readers::delete_reader),
        )
        // Staff accounts
        .route("/auth/sign-up", post(staff::sign_up))
        .route("/auth", get(staff::list_staff).patch(staff::update_staff))
        .route("/auth/:id", get(staff::get_staff))
        // Books
        .route("/books", post(books::create_book).get(books::list_books))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
