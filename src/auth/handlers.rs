use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookies::{clear_all_auth_cookies, set_auth_cookies},
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
            RegisterRequest, ResetPasswordRequest, VerifyEmailRequest,
        },
        guard::AuthUser,
        password::{
            generate_token, hash_password, is_valid_email, normalize_email, verify_password,
            MIN_PASSWORD_LEN,
        },
    },
    error::{ApiResponse, AppError, AppResult},
    extract::ApiJson,
    state::AppState,
    users::repo_types::{NewUser, Role, User},
};

const RESET_TOKEN_TTL: Duration = Duration::hours(1);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }
    Ok(())
}

/// Issues a token for `user` and attaches it as the session cookie.
fn start_session(state: &AppState, user: User) -> AppResult<(HeaderMap, AuthResponse)> {
    let token = state.keys.issue(user.id, &user.email, user.role)?;
    let mut headers = HeaderMap::new();
    set_auth_cookies(
        &mut headers,
        &state.config.cookie,
        &token,
        state.keys.ttl_seconds(),
    )?;
    Ok((headers, AuthResponse { token, user }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<ApiResponse<AuthResponse>>)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    check_password(&payload.password)?;
    if payload.role == Role::Admin {
        warn!(email = %payload.email, "attempt to self-register as admin");
        return Err(AppError::validation("Role must be CLIENT or FREELANCE"));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(NewUser {
            email: payload.email.clone(),
            password_hash,
            role: payload.role,
            name: payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            verification_token: generate_token(),
        })
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "email already registered");
            AppError::Conflict("Email already registered".into())
        })?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    let (headers, body) = start_session(&state, user)?;
    Ok((StatusCode::CREATED, headers, ApiResponse::ok(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> AppResult<(HeaderMap, Json<ApiResponse<AuthResponse>>)> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let Some(user) = state.store.find_user_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::unauthenticated("Invalid credentials"));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthenticated("Invalid credentials"));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(AppError::forbidden("Account is deactivated"));
    }

    info!(user_id = %user.id, "user logged in");
    let (headers, body) = start_session(&state, user)?;
    Ok((headers, ApiResponse::ok(body)))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> AppResult<(HeaderMap, Json<ApiResponse<MessageResponse>>)> {
    let mut headers = HeaderMap::new();
    clear_all_auth_cookies(&mut headers, &state.config.cookie)?;
    Ok((headers, ApiResponse::ok(MessageResponse::new("Logged out"))))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<ApiResponse<User>> {
    ApiResponse::ok(user)
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyEmailRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state
        .store
        .verify_email(payload.token.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Invalid verification token"))?;
    info!(user_id = %user.id, "email verified");
    Ok(ApiResponse::ok(user))
}

/// Always answers with the same message so callers cannot probe for accounts.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }

    let expires_at = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    let found = state
        .store
        .set_reset_token(&email, &generate_token(), expires_at)
        .await?;
    if found {
        info!(%email, "password reset requested");
    } else {
        warn!(%email, "password reset for unknown email");
    }

    Ok(ApiResponse::ok(MessageResponse::new(
        "If the account exists, a reset link has been sent",
    )))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    check_password(&payload.password)?;
    let password_hash = hash_password(&payload.password)?;

    let user = state
        .store
        .reset_password(payload.token.trim(), &password_hash, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| AppError::validation("Invalid or expired reset token"))?;

    info!(user_id = %user.id, "password reset");
    Ok(ApiResponse::ok(MessageResponse::new("Password updated")))
}
