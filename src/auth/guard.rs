//! Request-time authorization.
//!
//! [`AuthUser`] authenticates the caller and re-reads the user record so a
//! deactivation takes effect before the token expires. Role and ownership
//! decisions go through [`require_role`], [`require`] and [`owner_scope`].

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use super::cookies::token_from_cookies;
use crate::{
    error::AppError,
    state::AppState,
    store::OwnerScope,
    users::repo_types::{Capability, Role, User},
};

/// Authenticated caller, loaded fresh from the store.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Authenticated caller holding the ADMIN role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_from_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Header first, then the session cookie.
pub fn extract_token(headers: &HeaderMap, state: &AppState) -> Option<String> {
    bearer_from_header(headers).or_else(|| token_from_cookies(headers, &state.config.cookie))
}

/// Verifies `token` and loads the live user behind it.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, AppError> {
    let claims = state.keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::unauthenticated("Invalid or expired token")
    })?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for unknown user");
            AppError::unauthenticated("User not found")
        })?;

    if !user.is_active {
        warn!(user_id = %user.id, "token for deactivated user");
        return Err(AppError::unauthenticated("Account is deactivated"));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers, state)
            .ok_or_else(|| AppError::unauthenticated("Missing authentication token"))?;
        authenticate(state, &token).await.map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, Role::Admin)?;
        Ok(AdminUser(user))
    }
}

pub fn require_role(user: &User, role: Role) -> Result<(), AppError> {
    if user.role == role {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = %user.role, required = %role, "role mismatch");
        Err(AppError::forbidden("Insufficient role"))
    }
}

pub fn require(user: &User, capability: Capability) -> Result<(), AppError> {
    if user.role.can(capability) {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = %user.role, ?capability, "capability denied");
        Err(AppError::forbidden("Insufficient permissions"))
    }
}

/// Rows the user may mutate: any row if they hold `override_with`, else their own.
pub fn owner_scope(user: &User, override_with: Capability) -> OwnerScope {
    if user.role.can(override_with) {
        OwnerScope::Any
    } else {
        OwnerScope::Owner(user.id)
    }
}
