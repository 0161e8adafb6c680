use tracing::warn;
use uuid::Uuid;

use super::{
    dto::CreateMissionRequest,
    repo_types::{Mission, MissionUpdate, NewMission},
};
use crate::{
    auth::guard::{owner_scope, require},
    error::AppError,
    store::Store,
    users::repo_types::{Capability, User},
};

fn check_budget(budget: Option<f64>) -> Result<(), AppError> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => Err(AppError::validation("budget must be >= 0")),
        _ => Ok(()),
    }
}

fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for s in skills.into_iter().map(|s| s.trim().to_string()) {
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

async fn missing_or_forbidden(store: &dyn Store, id: Uuid, caller: &User) -> AppError {
    match store.find_mission(id).await {
        Ok(None) => AppError::not_found("Mission not found"),
        Ok(Some(m)) => {
            warn!(mission_id = %id, caller = %caller.id, owner = %m.client_id, "mission ownership mismatch");
            AppError::forbidden("Not your mission")
        }
        Err(e) => e.into(),
    }
}

/// The caller becomes the mission's client.
pub async fn create(
    store: &dyn Store,
    caller: &User,
    req: CreateMissionRequest,
) -> Result<Mission, AppError> {
    require(caller, Capability::PostMissions)?;
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    check_budget(req.budget)?;

    let new = NewMission {
        client_id: caller.id,
        title,
        description: req.description,
        budget: req.budget,
        skills: clean_skills(req.skills),
    };
    Ok(store.create_mission(new).await?)
}

/// Owner or a user allowed to manage any mission.
pub async fn update(
    store: &dyn Store,
    id: Uuid,
    caller: &User,
    mut update: MissionUpdate,
) -> Result<Mission, AppError> {
    if let Some(title) = update.title.as_mut() {
        *title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title cannot be empty"));
        }
    }
    check_budget(update.budget)?;
    update.skills = update.skills.map(clean_skills);

    let scope = owner_scope(caller, Capability::ManageAnyMission);
    match store.update_mission(id, scope, update).await? {
        Some(m) => Ok(m),
        None => Err(missing_or_forbidden(store, id, caller).await),
    }
}

pub async fn delete(store: &dyn Store, id: Uuid, caller: &User) -> Result<(), AppError> {
    let scope = owner_scope(caller, Capability::ManageAnyMission);
    if store.delete_mission(id, scope).await? {
        Ok(())
    } else {
        Err(missing_or_forbidden(store, id, caller).await)
    }
}
