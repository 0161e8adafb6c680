//! In-process store used by tests. Each method holds the lock for its whole
//! check-and-write, matching the single-statement behaviour of `PgStore`.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{OwnerScope, Store};
use crate::{
    missions::repo_types::{Mission, MissionFilter, MissionStatus, MissionUpdate, NewMission},
    notifications::repo_types::{NewNotification, Notification},
    users::repo_types::{NewUser, ProfileUpdate, User},
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    notifications: Vec<Notification>, // insertion order
    missions: Vec<Mission>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))
    }
}

fn allows(scope: OwnerScope, owner_id: Uuid) -> bool {
    match scope {
        OwnerScope::Owner(id) => id == owner_id,
        OwnerScope::Any => true,
    }
}

fn page<T>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut inner = self.lock()?;
        if inner.users.iter().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            is_active: true,
            email_verified: false,
            verification_token: Some(new.verification_token),
            reset_token: None,
            reset_expires_at: None,
            name: new.name,
            bio: None,
            skills: Vec::new(),
            hourly_rate: None,
            rating: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.push(user.clone());
        Ok(Some(user))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> anyhow::Result<Option<User>> {
        let mut inner = self.lock()?;
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = Some(name);
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }
        if let Some(skills) = update.skills {
            user.skills = skills;
        }
        if let Some(rate) = update.hourly_rate {
            user.hourly_rate = Some(rate);
        }
        Ok(Some(user.clone()))
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> anyhow::Result<Option<User>> {
        let mut inner = self.lock()?;
        Ok(inner.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.is_active = active;
            u.clone()
        }))
    }

    async fn verify_email(&self, token: &str) -> anyhow::Result<Option<User>> {
        let mut inner = self.lock()?;
        Ok(inner
            .users
            .iter_mut()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .map(|u| {
                u.email_verified = true;
                u.verification_token = None;
                u.clone()
            }))
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        let Some(user) = inner.users.iter_mut().find(|u| u.email == email) else {
            return Ok(false);
        };
        user.reset_token = Some(token.to_string());
        user.reset_expires_at = Some(expires_at);
        Ok(true)
    }

    async fn reset_password(
        &self,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let mut inner = self.lock()?;
        Ok(inner
            .users
            .iter_mut()
            .find(|u| {
                u.reset_token.as_deref() == Some(token)
                    && u.reset_expires_at.map_or(false, |exp| exp > now)
            })
            .map(|u| {
                u.password_hash = password_hash.to_string();
                u.reset_token = None;
                u.reset_expires_at = None;
                u.clone()
            }))
    }

    async fn create_notification(&self, new: NewNotification) -> anyhow::Result<Notification> {
        let row = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            link: new.link,
            read_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock()?.notifications.push(row.clone());
        Ok(row)
    }

    async fn list_notifications(
        &self,
        owner_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let inner = self.lock()?;
        let rows = inner
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == owner_id && (!unread_only || n.read_at.is_none()))
            .cloned();
        Ok(page(rows, limit, offset))
    }

    async fn count_unread(&self, owner_id: Uuid) -> anyhow::Result<i64> {
        let inner = self.lock()?;
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.user_id == owner_id && n.read_at.is_none())
            .count() as i64)
    }

    async fn notification_owner(&self, id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let inner = self.lock()?;
        Ok(inner.notifications.iter().find(|n| n.id == id).map(|n| n.user_id))
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Notification>> {
        let mut inner = self.lock()?;
        Ok(inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == owner_id)
            .map(|n| {
                n.read_at.get_or_insert(now);
                n.clone()
            }))
    }

    async fn delete_notification(&self, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|n| !(n.id == id && n.user_id == owner_id));
        Ok(inner.notifications.len() < before)
    }

    async fn mark_all_notifications_read(
        &self,
        owner_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<u64> {
        let mut inner = self.lock()?;
        let mut count = 0;
        for n in inner
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == owner_id && n.read_at.is_none())
        {
            n.read_at = Some(now);
            count += 1;
        }
        Ok(count)
    }

    async fn create_mission(&self, new: NewMission) -> anyhow::Result<Mission> {
        let now = OffsetDateTime::now_utc();
        let row = Mission {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            title: new.title,
            description: new.description,
            budget: new.budget,
            skills: new.skills,
            status: MissionStatus::Open,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.missions.push(row.clone());
        Ok(row)
    }

    async fn list_missions(&self, filter: MissionFilter) -> anyhow::Result<Vec<Mission>> {
        let inner = self.lock()?;
        let rows = inner
            .missions
            .iter()
            .rev()
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .filter(|m| filter.client_id.map_or(true, |c| m.client_id == c))
            .cloned();
        Ok(page(rows, filter.limit, filter.offset))
    }

    async fn find_mission(&self, id: Uuid) -> anyhow::Result<Option<Mission>> {
        Ok(self.lock()?.missions.iter().find(|m| m.id == id).cloned())
    }

    async fn update_mission(
        &self,
        id: Uuid,
        scope: OwnerScope,
        update: MissionUpdate,
    ) -> anyhow::Result<Option<Mission>> {
        let mut inner = self.lock()?;
        let Some(m) = inner
            .missions
            .iter_mut()
            .find(|m| m.id == id && allows(scope, m.client_id))
        else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            m.title = title;
        }
        if let Some(description) = update.description {
            m.description = description;
        }
        if let Some(budget) = update.budget {
            m.budget = Some(budget);
        }
        if let Some(skills) = update.skills {
            m.skills = skills;
        }
        if let Some(status) = update.status {
            m.status = status;
        }
        m.updated_at = OffsetDateTime::now_utc();
        Ok(Some(m.clone()))
    }

    async fn delete_mission(&self, id: Uuid, scope: OwnerScope) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.missions.len();
        inner
            .missions
            .retain(|m| !(m.id == id && allows(scope, m.client_id)));
        Ok(inner.missions.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "x".into(),
            role: Role::Client,
            name: None,
            verification_token: format!("verify-{email}"),
        }
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        assert!(store.create_user(new_user("a@x.io")).await.unwrap().is_some());
        assert!(store.create_user(new_user("a@x.io")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scoped_delete_leaves_foreign_rows() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let m = store
            .create_mission(NewMission {
                client_id: owner,
                title: "t".into(),
                description: "d".into(),
                budget: None,
                skills: vec![],
            })
            .await
            .unwrap();
        assert!(!store
            .delete_mission(m.id, OwnerScope::Owner(Uuid::new_v4()))
            .await
            .unwrap());
        assert!(store.find_mission(m.id).await.unwrap().is_some());
        assert!(store.delete_mission(m.id, OwnerScope::Any).await.unwrap());
    }
}
