use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{OwnerScope, Store};
use crate::{
    missions::repo_types::{Mission, MissionFilter, MissionUpdate, NewMission},
    notifications::repo_types::{NewNotification, Notification},
    users::repo_types::{NewUser, ProfileUpdate, User},
};

const USER_COLUMNS: &str = "id, email, password_hash, role, is_active, email_verified, \
     verification_token, reset_token, reset_expires_at, name, bio, skills, hourly_rate, \
     rating, created_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, link, read_at, created_at";

const MISSION_COLUMNS: &str =
    "id, client_id, title, description, budget, skills, status, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn scope_owner(scope: OwnerScope) -> Option<Uuid> {
    match scope {
        OwnerScope::Owner(id) => Some(id),
        OwnerScope::Any => None,
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, role, name, verification_token)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role)
            .bind(&new.name)
            .bind(&new.verification_token)
            .fetch_optional(&self.db)
            .await
            .context("insert user")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   bio = COALESCE($3, bio),
                   skills = COALESCE($4, skills),
                   hourly_rate = COALESCE($5, hourly_rate)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.bio)
            .bind(update.skills)
            .bind(update.hourly_rate)
            .fetch_optional(&self.db)
            .await
            .context("update profile")?;
        Ok(user)
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<User>> {
        let sql = format!("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.db)
            .await
            .context("set user active")?;
        Ok(user)
    }

    async fn verify_email(&self, token: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET email_verified = TRUE, verification_token = NULL
             WHERE verification_token = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.db)
            .await
            .context("verify email")?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET reset_token = $2, reset_expires_at = $3
             WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("set reset token")?;
        Ok(res.rows_affected() > 0)
    }

    async fn reset_password(
        &self,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET password_hash = $2, reset_token = NULL, reset_expires_at = NULL
             WHERE reset_token = $1 AND reset_expires_at > $3
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .bind(password_hash)
            .bind(now)
            .fetch_optional(&self.db)
            .await
            .context("reset password")?;
        Ok(user)
    }

    async fn create_notification(&self, new: NewNotification) -> anyhow::Result<Notification> {
        let sql = format!(
            r#"
            INSERT INTO notifications (user_id, title, message, link)
            VALUES ($1, $2, $3, $4)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Notification>(&sql)
            .bind(new.user_id)
            .bind(&new.title)
            .bind(&new.message)
            .bind(&new.link)
            .fetch_one(&self.db)
            .await
            .context("insert notification")?;
        Ok(row)
    }

    async fn list_notifications(
        &self,
        owner_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let sql = format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
              FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, Notification>(&sql)
            .bind(owner_id)
            .bind(unread_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .context("list notifications")?;
        Ok(rows)
    }

    async fn count_unread(&self, owner_id: Uuid) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(&self.db)
        .await
        .context("count unread notifications")?;
        Ok(count)
    }

    async fn notification_owner(&self, id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("notification owner")?;
        Ok(owner)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Notification>> {
        let sql = format!(
            r#"
            UPDATE notifications
               SET read_at = COALESCE(read_at, $3)
             WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(now)
            .fetch_optional(&self.db)
            .await
            .context("mark notification read")?;
        Ok(row)
    }

    async fn delete_notification(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .context("delete notification")?;
        Ok(res.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(
        &self,
        owner_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query(
            "UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(owner_id)
        .bind(now)
        .execute(&self.db)
        .await
        .context("mark all notifications read")?;
        Ok(res.rows_affected())
    }

    async fn create_mission(&self, new: NewMission) -> anyhow::Result<Mission> {
        let sql = format!(
            r#"
            INSERT INTO missions (client_id, title, description, budget, skills)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MISSION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Mission>(&sql)
            .bind(new.client_id)
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.budget)
            .bind(&new.skills)
            .fetch_one(&self.db)
            .await
            .context("insert mission")?;
        Ok(row)
    }

    async fn list_missions(&self, filter: MissionFilter) -> anyhow::Result<Vec<Mission>> {
        let sql = format!(
            r#"
            SELECT {MISSION_COLUMNS}
              FROM missions
             WHERE ($1::mission_status IS NULL OR status = $1)
               AND ($2::uuid IS NULL OR client_id = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, Mission>(&sql)
            .bind(filter.status)
            .bind(filter.client_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.db)
            .await
            .context("list missions")?;
        Ok(rows)
    }

    async fn find_mission(&self, id: Uuid) -> anyhow::Result<Option<Mission>> {
        let sql = format!("SELECT {MISSION_COLUMNS} FROM missions WHERE id = $1");
        let row = sqlx::query_as::<_, Mission>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find mission")?;
        Ok(row)
    }

    async fn update_mission(
        &self,
        id: Uuid,
        scope: OwnerScope,
        update: MissionUpdate,
    ) -> anyhow::Result<Option<Mission>> {
        let sql = format!(
            r#"
            UPDATE missions
               SET title = COALESCE($3, title),
                   description = COALESCE($4, description),
                   budget = COALESCE($5, budget),
                   skills = COALESCE($6, skills),
                   status = COALESCE($7, status),
                   updated_at = now()
             WHERE id = $1 AND ($2::uuid IS NULL OR client_id = $2)
            RETURNING {MISSION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Mission>(&sql)
            .bind(id)
            .bind(scope_owner(scope))
            .bind(update.title)
            .bind(update.description)
            .bind(update.budget)
            .bind(update.skills)
            .bind(update.status)
            .fetch_optional(&self.db)
            .await
            .context("update mission")?;
        Ok(row)
    }

    async fn delete_mission(&self, id: Uuid, scope: OwnerScope) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "DELETE FROM missions WHERE id = $1 AND ($2::uuid IS NULL OR client_id = $2)",
        )
        .bind(id)
        .bind(scope_owner(scope))
        .execute(&self.db)
        .await
        .context("delete mission")?;
        Ok(res.rows_affected() > 0)
    }
}

// cargo test --features postgres-tests
#[cfg(all(test, feature = "postgres-tests"))]
mod tests {
    use super::*;
    use crate::{missions::repo_types::MissionStatus, users::repo_types::Role};

    async fn seed(store: &PgStore, email: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                email: email.into(),
                password_hash: "x".into(),
                role,
                name: Some("Original".into()),
                verification_token: format!("verify-{email}"),
            })
            .await
            .unwrap()
            .expect("fresh email")
    }

    fn mission(client_id: Uuid, title: &str) -> NewMission {
        NewMission {
            client_id,
            title: title.into(),
            description: "d".into(),
            budget: Some(100.0),
            skills: vec!["rust".into()],
        }
    }

    #[sqlx::test]
    async fn duplicate_email_is_none(pool: PgPool) {
        let store = PgStore::new(pool);
        seed(&store, "a@x.io", Role::Client).await;
        let again = store
            .create_user(NewUser {
                email: "a@x.io".into(),
                password_hash: "x".into(),
                role: Role::Freelance,
                name: None,
                verification_token: "other".into(),
            })
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[sqlx::test]
    async fn profile_update_keeps_omitted_fields(pool: PgPool) {
        let store = PgStore::new(pool);
        let user = seed(&store, "f@x.io", Role::Freelance).await;
        let updated = store
            .update_profile(
                user.id,
                ProfileUpdate {
                    bio: Some("Backend dev".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Original"));
        assert_eq!(updated.bio.as_deref(), Some("Backend dev"));
    }

    #[sqlx::test]
    async fn list_missions_filters_by_status_and_client(pool: PgPool) {
        let store = PgStore::new(pool);
        let a = seed(&store, "a@x.io", Role::Client).await;
        let b = seed(&store, "b@x.io", Role::Client).await;
        let first = store.create_mission(mission(a.id, "first")).await.unwrap();
        store.create_mission(mission(b.id, "second")).await.unwrap();
        store
            .update_mission(
                first.id,
                OwnerScope::Owner(a.id),
                MissionUpdate {
                    status: Some(MissionStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        let all = |status, client_id| MissionFilter {
            status,
            client_id,
            limit: 10,
            offset: 0,
        };
        assert_eq!(store.list_missions(all(None, None)).await.unwrap().len(), 2);
        let open = store
            .list_missions(all(Some(MissionStatus::Open), None))
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].client_id, b.id);
        let mine = store.list_missions(all(None, Some(a.id))).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, MissionStatus::InProgress);
    }

    #[sqlx::test]
    async fn mission_update_is_partial_and_scoped(pool: PgPool) {
        let store = PgStore::new(pool);
        let owner = seed(&store, "o@x.io", Role::Client).await;
        let other = seed(&store, "x@x.io", Role::Client).await;
        let m = store.create_mission(mission(owner.id, "title")).await.unwrap();

        let denied = store
            .update_mission(
                m.id,
                OwnerScope::Owner(other.id),
                MissionUpdate {
                    title: Some("hijacked".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(denied.is_none());

        let updated = store
            .update_mission(
                m.id,
                OwnerScope::Any,
                MissionUpdate {
                    budget: Some(250.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "title");
        assert_eq!(updated.budget, Some(250.0));
        assert_eq!(updated.skills, vec!["rust".to_string()]);
    }

    #[sqlx::test]
    async fn mark_read_keeps_first_timestamp(pool: PgPool) {
        let store = PgStore::new(pool);
        let user = seed(&store, "n@x.io", Role::Freelance).await;
        let n = store
            .create_notification(NewNotification {
                user_id: user.id,
                title: "t".into(),
                message: "m".into(),
                link: None,
            })
            .await
            .unwrap();

        let first = OffsetDateTime::now_utc();
        let later = first + time::Duration::minutes(5);
        let read = store
            .mark_notification_read(n.id, user.id, first)
            .await
            .unwrap()
            .unwrap();
        let again = store
            .mark_notification_read(n.id, user.id, later)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.read_at, again.read_at);
        assert_eq!(store.mark_all_notifications_read(user.id, later).await.unwrap(), 0);
    }
}
