//! Reader endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        pagination::PageQuery,
        reader::{CreateReader, Reader, UpdateReader},
    },
    AppState,
};

use super::{ApiResponse, AuthenticatedStaff};

/// Register a reader
#[utoipa::path(
    post,
    path = "/readers",
    tag = "readers",
    security(("bearer_auth" = [])),
    request_body = CreateReader,
    responses(
        (status = 201, description = "Reader created", body = Reader),
        (status = 400, description = "Invalid name, email or CPF"),
        (status = 409, description = "Email or CPF already registered")
    )
)]
pub async fn create_reader(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Json(data): Json<CreateReader>,
) -> AppResult<(StatusCode, Json<ApiResponse<Reader>>)> {
    let reader = state.services.readers.create(data).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(reader))))
}

/// List readers
#[utoipa::path(
    get,
    path = "/readers",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Readers", body = Vec<Reader>),
        (status = 400, description = "Invalid pagination")
    )
)]
pub async fn list_readers(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<Vec<Reader>>>> {
    let (readers, page, total) = state.services.readers.list(query).await?;
    Ok(Json(ApiResponse::page(readers, page, Some(total))))
}

/// Get reader by ID
#[utoipa::path(
    get,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reader ID")
    ),
    responses(
        (status = 200, description = "Reader", body = Reader),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn get_reader(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Reader>>> {
    let reader = state.services.readers.get(id).await?;
    Ok(Json(ApiResponse::new(reader)))
}

/// Update reader name and/or email
#[utoipa::path(
    put,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reader ID")
    ),
    request_body = UpdateReader,
    responses(
        (status = 200, description = "Reader updated", body = Reader),
        (status = 404, description = "Reader not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_reader(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Path(id): Path<i32>,
    Json(data): Json<UpdateReader>,
) -> AppResult<Json<ApiResponse<Reader>>> {
    let reader = state.services.readers.update(id, data).await?;
    Ok(Json(ApiResponse::new(reader)))
}

/// Delete a reader and their loans
#[utoipa::path(
    delete,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reader ID")
    ),
    responses(
        (status = 204, description = "Reader deleted"),
        (status = 403, description = "Administrator rights required"),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn delete_reader(
    State(state): State<AppState>,
    AuthenticatedStaff(claims): AuthenticatedStaff,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.readers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
