use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::repo_types::Notification;
use crate::{error::AppError, store::Store, users::repo_types::User};

/// Explains why a scoped write matched nothing: the row is gone, or it belongs
/// to someone else.
async fn missing_or_forbidden(store: &dyn Store, id: Uuid, caller: &User) -> AppError {
    match store.notification_owner(id).await {
        Ok(None) => AppError::not_found("Notification not found"),
        Ok(Some(owner)) => {
            warn!(notification_id = %id, caller = %caller.id, %owner, "notification ownership mismatch");
            AppError::forbidden("Not your notification")
        }
        Err(e) => e.into(),
    }
}

/// Sets the read timestamp once; later calls return the original one.
pub async fn mark_read(store: &dyn Store, id: Uuid, caller: &User) -> Result<Notification, AppError> {
    let now = OffsetDateTime::now_utc();
    match store.mark_notification_read(id, caller.id, now).await? {
        Some(n) => Ok(n),
        None => Err(missing_or_forbidden(store, id, caller).await),
    }
}

pub async fn delete(store: &dyn Store, id: Uuid, caller: &User) -> Result<(), AppError> {
    if store.delete_notification(id, caller.id).await? {
        Ok(())
    } else {
        Err(missing_or_forbidden(store, id, caller).await)
    }
}

pub async fn mark_all_read(store: &dyn Store, caller: &User) -> Result<u64, AppError> {
    Ok(store
        .mark_all_notifications_read(caller.id, OffsetDateTime::now_utc())
        .await?)
}
