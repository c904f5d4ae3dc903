use crate::errors::OtpError;
use crate::handlers::observe_error;
use crate::models::{ListUsersQuery, ListUsersResponse, UserResponse};
use crate::routes::AppState;
use crate::validation;
use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;

/// Handle user listing
///
/// GET /api/v1/users?page=&limit=&search=
///
/// Requires a bearer token (enforced by `require_auth`).
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, OtpError> {
    let params = validation::validate_list_users(&query)?;

    let response = state
        .user_service
        .list_users(params.page, params.limit, params.search.as_deref())
        .await
        .map_err(observe_error("list_users"))?;

    Ok(Json(response))
}

/// Handle user lookup
///
/// GET /api/v1/users/:id
///
/// Requires a bearer token (enforced by `require_auth`).
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, OtpError> {
    let user_id = validation::validate_user_id(&id)?;

    let user = state
        .user_service
        .get_user(user_id)
        .await
        .map_err(observe_error("get_user"))?;

    Ok(Json(user))
}
