use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CountResponse, CreateNotificationRequest, ListQuery},
    repo_types::{NewNotification, Notification},
    services,
};
use crate::{
    auth::guard::{AdminUser, AuthUser},
    error::{ApiResponse, AppError, AppResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications).post(create_notification))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/:id/read", put(mark_read))
        .route("/notifications/:id", delete(delete_notification))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    let rows = state
        .store
        .list_notifications(user.id, q.unread, q.limit.clamp(1, 100), q.offset.max(0))
        .await?;
    Ok(ApiResponse::ok(rows))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ApiResponse<CountResponse>>> {
    let count = state.store.count_unread(user.id).await?;
    Ok(ApiResponse::ok(CountResponse {
        count: count.max(0) as u64,
    }))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create_notification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(body): ApiJson<CreateNotificationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Notification>>)> {
    if body.title.trim().is_empty() || body.message.trim().is_empty() {
        return Err(AppError::validation("title and message are required"));
    }
    if state.store.find_user_by_id(body.user_id).await?.is_none() {
        return Err(AppError::not_found("Recipient not found"));
    }

    let row = state
        .store
        .create_notification(NewNotification {
            user_id: body.user_id,
            title: body.title.trim().to_string(),
            message: body.message.trim().to_string(),
            link: body.link,
        })
        .await?;
    info!(notification_id = %row.id, recipient = %row.user_id, "notification created");
    Ok((StatusCode::CREATED, ApiResponse::ok(row)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let row = services::mark_read(state.store.as_ref(), id, &user).await?;
    Ok(ApiResponse::ok(row))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    services::delete(state.store.as_ref(), id, &user).await?;
    info!(notification_id = %id, "notification deleted");
    Ok(ApiResponse::ok(id))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ApiResponse<CountResponse>>> {
    let count = services::mark_all_read(state.store.as_ref(), &user).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}
