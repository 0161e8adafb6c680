use serde::Deserialize;
use uuid::Uuid;

use super::repo_types::MissionStatus;

#[derive(Debug, Deserialize)]
pub struct CreateMissionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub budget: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MissionQuery {
    pub status: Option<MissionStatus>,
    pub client_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }
