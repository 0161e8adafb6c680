use axum::{
    extract::State,
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateMissionRequest, MissionQuery},
    repo_types::{Mission, MissionFilter, MissionUpdate},
    services,
};
use crate::{
    auth::guard::AuthUser,
    error::{ApiResponse, AppError, AppResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn mission_routes() -> Router<AppState> {
    Router::new()
        .route("/missions", get(list_missions).post(create_mission))
        .route(
            "/missions/:id",
            get(get_mission).put(update_mission).delete(delete_mission),
        )
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_missions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(q): ApiQuery<MissionQuery>,
) -> AppResult<Json<ApiResponse<Vec<Mission>>>> {
    let rows = state
        .store
        .list_missions(MissionFilter {
            status: q.status,
            client_id: q.client_id,
            limit: q.limit.clamp(1, 100),
            offset: q.offset.max(0),
        })
        .await?;
    Ok(ApiResponse::ok(rows))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_mission(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Mission>>> {
    let mission = state
        .store
        .find_mission(id)
        .await?
        .ok_or_else(|| AppError::not_found("Mission not found"))?;
    Ok(ApiResponse::ok(mission))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_mission(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<CreateMissionRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<ApiResponse<Mission>>)> {
    let mission = services::create(state.store.as_ref(), &user, body).await?;
    info!(mission_id = %mission.id, "mission created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/missions/{}", mission.id)) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, ApiResponse::ok(mission)))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_mission(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<MissionUpdate>,
) -> AppResult<Json<ApiResponse<Mission>>> {
    let mission = services::update(state.store.as_ref(), id, &user, body).await?;
    info!(mission_id = %id, status = ?mission.status, "mission updated");
    Ok(ApiResponse::ok(mission))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_mission(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    services::delete(state.store.as_ref(), id, &user).await?;
    info!(mission_id = %id, "mission deleted");
    Ok(ApiResponse::ok(id))
}
