//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::domain::types::{
    ArticleStatus, CampaignStatus, ContractStatus, DealStage, SubscriberStatus, TaskPriority,
    TaskStatus, VendorCategory, WorkshopFormat,
};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ClientRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: String,
    pub portal_token: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SpeakerRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub email: Option<String>,
    pub headline: String,
    pub bio: String,
    pub topics: Vec<String>,
    pub location: Option<String>,
    pub fee_min_cents: Option<i64>,
    pub fee_max_cents: Option<i64>,
    pub active: bool,
    pub portal_token: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct DealRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub speaker_id: Option<Uuid>,
    pub event_name: String,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
    pub value_cents: i64,
    pub currency: String,
    pub stage: DealStage,
    pub notes: String,
    pub closed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ContractRecord {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub number: String,
    pub fee_cents: i64,
    pub currency: String,
    pub terms: String,
    pub status: ContractStatus,
    pub view_token: String,
    pub sent_at: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
    pub signed_at: Option<OffsetDateTime>,
    pub signer_name: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Contract joined with the parties shown in the public viewer and portals.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ContractView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub contract: ContractRecord,
    pub client_name: String,
    pub speaker_name: Option<String>,
    pub event_name: String,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TaskRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_on: Option<Date>,
    pub assignee: Option<String>,
    pub deal_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub completed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SubscriberRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub status: SubscriberStatus,
    #[serde(skip_serializing)]
    pub unsubscribe_token: String,
    pub source: String,
    pub subscribed_at: OffsetDateTime,
    pub unsubscribed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CampaignRecord {
    pub id: Uuid,
    pub subject: String,
    pub preheader: Option<String>,
    pub body_markdown: String,
    pub status: CampaignStatus,
    pub recipient_count: i32,
    pub rendered_html: Option<String>,
    pub sent_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub source: String,
    pub external_id: String,
    pub slug: String,
    pub title: String,
    pub meta_description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub body_markdown: String,
    pub body_json: serde_json::Value,
    pub body_html: String,
    pub word_count: i32,
    pub reading_minutes: i32,
    pub status: ArticleStatus,
    pub published_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Lightweight article projection for listings.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ArticleSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub meta_description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub reading_minutes: i32,
    pub status: ArticleStatus,
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ConferenceRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub country: String,
    pub starts_on: Date,
    pub ends_on: Date,
    pub website_url: Option<String>,
    pub cfp_deadline: Option<Date>,
    pub published: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct WorkshopRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub speaker_id: Uuid,
    pub summary: String,
    pub format: WorkshopFormat,
    pub duration_minutes: i32,
    pub price_cents: Option<i64>,
    pub published: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Workshop joined with its speaker for the public directory.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct WorkshopListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub workshop: WorkshopRecord,
    pub speaker_name: String,
    pub speaker_slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct VendorRecord {
    pub id: Uuid,
    pub name: String,
    pub category: VendorCategory,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<i16>,
    pub notes: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub payload_text: Option<String>,
    pub created_at: OffsetDateTime,
}
