use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "mission_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Mission {
    pub id: Uuid,
    pub client_id: Uuid, // owner, always a CLIENT
    pub title: String,
    pub description: String,
    pub budget: Option<f64>,
    pub skills: Vec<String>,
    pub status: MissionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMission {
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: Option<f64>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MissionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub skills: Option<Vec<String>>,
    pub status: Option<MissionStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct MissionFilter {
    pub status: Option<MissionStatus>,
    pub client_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}
