//! HTTP handlers for the caller's own user record

use axum::{extract::State, Json};
use shared::{RoleProfile, User};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::UserService;
use crate::AppState;

/// The caller's user record, provisioned from token claims on first call
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let user = UserService::new(state.db).current(&current_user.0).await?;
    Ok(Json(user))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(profile): Json<RoleProfile>,
) -> AppResult<Json<User>> {
    let user = UserService::new(state.db)
        .update_profile(&current_user.0, profile)
        .await?;
    Ok(Json(user))
}
