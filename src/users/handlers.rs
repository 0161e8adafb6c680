use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{PublicProfile, SetStatusRequest},
    repo_types::{Capability, ProfileUpdate, User},
};
use crate::{
    auth::guard::{require, AuthUser},
    error::{ApiResponse, AppError, AppResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", put(update_me))
        .route("/users/:id", get(get_profile))
        .route("/users/:id/status", put(set_status))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<PublicProfile>>> {
    let user = state
        .store
        .find_user_by_id(id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(mut body): ApiJson<ProfileUpdate>,
) -> AppResult<Json<ApiResponse<User>>> {
    if matches!(body.hourly_rate, Some(r) if !r.is_finite() || r < 0.0) {
        return Err(AppError::validation("hourly_rate must be >= 0"));
    }
    body.name = body.name.map(|n| n.trim().to_string());
    body.skills = body.skills.map(|skills| {
        skills
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });

    let updated = state
        .store
        .update_profile(user.id, body)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!("profile updated");
    Ok(ApiResponse::ok(updated))
}

#[instrument(skip(state, caller, body), fields(caller_id = %caller.id))]
pub async fn set_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SetStatusRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    require(&caller, Capability::ManageUsers)?;
    if id == caller.id && !body.is_active {
        return Err(AppError::validation("Admins cannot deactivate themselves"));
    }
    let user = state
        .store
        .set_user_active(id, body.is_active)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(target_user = %id, is_active = body.is_active, "user status changed");
    Ok(ApiResponse::ok(user))
}
