//! Staff account endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::staff::{CreateStaff, Staff, UpdateStaff},
    AppState,
};

use super::{ApiResponse, AuthenticatedStaff};

/// Register a staff account (admin only)
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    tag = "staff",
    security(("bearer_auth" = [])),
    request_body = CreateStaff,
    responses(
        (status = 201, description = "Account created", body = Staff),
        (status = 400, description = "Invalid name, email, password or role"),
        (status = 403, description = "Administrator rights required"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    AuthenticatedStaff(claims): AuthenticatedStaff,
    Json(data): Json<CreateStaff>,
) -> AppResult<(StatusCode, Json<ApiResponse<Staff>>)> {
    claims.require_admin()?;

    let staff = state.services.staff.create(data).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(staff))))
}

/// List staff accounts (admin only)
#[utoipa::path(
    get,
    path = "/auth",
    tag = "staff",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Staff accounts", body = Vec<Staff>),
        (status = 403, description = "Administrator rights required")
    )
)]
pub async fn list_staff(
    State(state): State<AppState>,
    AuthenticatedStaff(claims): AuthenticatedStaff,
) -> AppResult<Json<ApiResponse<Vec<Staff>>>> {
    claims.require_admin()?;

    let staff = state.services.staff.list().await?;
    let total = staff.len() as i64;
    Ok(Json(ApiResponse::page(staff, None, Some(total))))
}

/// Get staff account by ID (admin only)
#[utoipa::path(
    get,
    path = "/auth/{id}",
    tag = "staff",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Staff account ID")
    ),
    responses(
        (status = 200, description = "Staff account", body = Staff),
        (status = 403, description = "Administrator rights required"),
        (status = 404, description = "Staff account not found")
    )
)]
pub async fn get_staff(
    State(state): State<AppState>,
    AuthenticatedStaff(claims): AuthenticatedStaff,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Staff>>> {
    claims.require_admin()?;

    let staff = state.services.staff.get(id).await?;
    Ok(Json(ApiResponse::new(staff)))
}

/// Update own account, confirming the current email and password
#[utoipa::path(
    patch,
    path = "/auth",
    tag = "staff",
    security(("bearer_auth" = [])),
    request_body = UpdateStaff,
    responses(
        (status = 200, description = "Account updated", body = Staff),
        (status = 400, description = "Invalid new email, password or name"),
        (status = 401, description = "Current email or password is wrong"),
        (status = 409, description = "New email already registered")
    )
)]
pub async fn update_staff(
    State(state): State<AppState>,
    _staff: AuthenticatedStaff,
    Json(data): Json<UpdateStaff>,
) -> AppResult<Json<ApiResponse<Staff>>> {
    let staff = state.services.staff.update(data).await?;
    Ok(Json(ApiResponse::new(staff)))
}
