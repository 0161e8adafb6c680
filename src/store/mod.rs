//! Persistence handle injected into every handler through `AppState`.
//!
//! Mutations that depend on ownership take an [`OwnerScope`] and apply it in
//! the same statement as the write, so there is no window between the check
//! and the change.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    missions::repo_types::{Mission, MissionFilter, MissionUpdate, NewMission},
    notifications::repo_types::{NewNotification, Notification},
    users::repo_types::{NewUser, ProfileUpdate, User},
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Restricts a write to rows owned by one user, or lets it through for any owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    Owner(Uuid),
    Any,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ---- users ----

    /// Returns `None` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> anyhow::Result<Option<User>>;
    async fn set_user_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<User>>;
    /// Consumes a verification token.
    async fn verify_email(&self, token: &str) -> anyhow::Result<Option<User>>;
    /// Returns false when no user has this email.
    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<bool>;
    /// Replaces the password hash if the token exists and has not expired at `now`.
    async fn reset_password(
        &self,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>>;

    // ---- notifications ----

    async fn create_notification(&self, new: NewNotification) -> anyhow::Result<Notification>;
    async fn list_notifications(
        &self,
        owner_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Notification>>;
    async fn count_unread(&self, owner_id: Uuid) -> anyhow::Result<i64>;
    async fn notification_owner(&self, id: Uuid) -> anyhow::Result<Option<Uuid>>;
    /// Sets `read_at` to `now` unless already set. `None` if no row matched id and owner.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Notification>>;
    async fn delete_notification(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool>;
    /// Returns how many unread notifications were marked.
    async fn mark_all_notifications_read(
        &self,
        owner_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<u64>;

    // ---- missions ----

    async fn create_mission(&self, new: NewMission) -> anyhow::Result<Mission>;
    async fn list_missions(&self, filter: MissionFilter) -> anyhow::Result<Vec<Mission>>;
    async fn find_mission(&self, id: Uuid) -> anyhow::Result<Option<Mission>>;
    async fn update_mission(
        &self,
        id: Uuid,
        scope: OwnerScope,
        update: MissionUpdate,
    ) -> anyhow::Result<Option<Mission>>;
    async fn delete_mission(&self, id: Uuid, scope: OwnerScope) -> anyhow::Result<bool>;
}
