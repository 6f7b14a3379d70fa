//! Query strings and small request bodies accepted by the HTTP surfaces.

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::domain::types::{
    ArticleStatus, ContractStatus, DealStage, SubscriberStatus, TaskPriority, TaskStatus,
    VendorCategory, WorkshopFormat,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CursorQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchListQuery {
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpeakerListQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SpeakerActiveRequest {
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DealListQuery {
    pub stage: Option<DealStage>,
    pub client_id: Option<Uuid>,
    pub speaker_id: Option<Uuid>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContractListQuery {
    pub status: Option<ContractStatus>,
    pub deal_id: Option<Uuid>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub priority: Option<TaskPriority>,
    pub deal_id: Option<Uuid>,
    pub overdue: Option<bool>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscriberListQuery {
    pub status: Option<SubscriberStatus>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleListQuery {
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConferenceListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub include_past: Option<bool>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkshopListQuery {
    pub format: Option<WorkshopFormat>,
    pub speaker: Option<String>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VendorListQuery {
    pub category: Option<VendorCategory>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActivityListQuery {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsQuery {
    pub from: Option<Date>,
    pub to: Option<Date>,
}
