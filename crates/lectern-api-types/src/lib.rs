//! Shared enums and request payloads for the Lectern operations API.
//!
//! The enums mirror Postgres enum types. Enable the `sqlx` feature to derive
//! `sqlx::Type` so they can be bound and decoded directly.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

macro_rules! string_enum {
    ($name:ident, $pg:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(type_name = $pg, rename_all = "snake_case"))]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Returned when parsing an enum from an unrecognised string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

string_enum!(DealStage, "deal_stage", {
    Lead => "lead",
    Qualified => "qualified",
    Proposal => "proposal",
    Negotiation => "negotiation",
    Won => "won",
    Lost => "lost",
});

string_enum!(ContractStatus, "contract_status", {
    Draft => "draft",
    Sent => "sent",
    Signed => "signed",
    Cancelled => "cancelled",
    Expired => "expired",
});

string_enum!(TaskStatus, "task_status", {
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
});

string_enum!(TaskPriority, "task_priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

string_enum!(SubscriberStatus, "subscriber_status", {
    Active => "active",
    Unsubscribed => "unsubscribed",
});

string_enum!(CampaignStatus, "campaign_status", {
    Draft => "draft",
    Sent => "sent",
});

string_enum!(ArticleStatus, "article_status", {
    Published => "published",
    Hidden => "hidden",
});

string_enum!(WorkshopFormat, "workshop_format", {
    InPerson => "in_person",
    Virtual => "virtual",
    Hybrid => "hybrid",
});

string_enum!(VendorCategory, "vendor_category", {
    Av => "av",
    Venue => "venue",
    Travel => "travel",
    Catering => "catering",
    Production => "production",
    Other => "other",
});

impl DealStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, DealStage::Won | DealStage::Lost)
    }

    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

// -------- Clients --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientCreateRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: String,
}

pub type ClientUpdateRequest = ClientCreateRequest;

// -------- Speakers --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeakerCreateRequest {
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub location: Option<String>,
    pub fee_min_cents: Option<i64>,
    pub fee_max_cents: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

pub type SpeakerUpdateRequest = SpeakerCreateRequest;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeakerProfilePatch {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub topics: Option<Vec<String>>,
    pub location: Option<String>,
}

// -------- Deals --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DealCreateRequest {
    pub client_id: Uuid,
    pub speaker_id: Option<Uuid>,
    pub event_name: String,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
    #[serde(default)]
    pub value_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DealUpdateRequest {
    pub speaker_id: Option<Uuid>,
    pub event_name: String,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
    pub value_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DealStageRequest {
    pub stage: DealStage,
}

// -------- Contracts --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractCreateRequest {
    pub deal_id: Uuid,
    pub fee_cents: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub terms: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractUpdateRequest {
    pub fee_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub terms: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractSendRequest {
    pub validity_days: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractSignRequest {
    pub signer_name: String,
}

// -------- Tasks --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskCreateRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<TaskPriority>,
    pub due_on: Option<Date>,
    pub assignee: Option<String>,
    pub deal_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskUpdateRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: TaskPriority,
    pub due_on: Option<Date>,
    pub assignee: Option<String>,
    pub deal_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

// -------- Newsletter --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub name: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CampaignCreateRequest {
    pub subject: String,
    pub preheader: Option<String>,
    #[serde(default)]
    pub body_markdown: String,
}

pub type CampaignUpdateRequest = CampaignCreateRequest;

// -------- Articles --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleStatusRequest {
    pub status: ArticleStatus,
}

// -------- Conferences --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConferenceCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub city: String,
    pub country: String,
    pub starts_on: Date,
    pub ends_on: Date,
    pub website_url: Option<String>,
    pub cfp_deadline: Option<Date>,
    #[serde(default)]
    pub published: bool,
}

pub type ConferenceUpdateRequest = ConferenceCreateRequest;

// -------- Workshops --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkshopCreateRequest {
    pub title: String,
    pub speaker_id: Uuid,
    #[serde(default)]
    pub summary: String,
    pub format: WorkshopFormat,
    pub duration_minutes: i32,
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub published: bool,
}

pub type WorkshopUpdateRequest = WorkshopCreateRequest;

// -------- Vendors --------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VendorCreateRequest {
    pub name: String,
    pub category: VendorCategory,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<i16>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

pub type VendorUpdateRequest = VendorCreateRequest;

// -------- Webhooks --------

/// Envelope delivered by the Outrank publishing integration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutrankWebhookPayload {
    pub event_type: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub data: OutrankWebhookData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutrankWebhookData {
    #[serde(default)]
    pub articles: Vec<OutrankArticle>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutrankArticle {
    pub id: String,
    pub title: String,
    pub content_markdown: Option<String>,
    pub content_html: Option<String>,
    pub meta_description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    pub image_url: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeadWebhookPayload {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub event_name: Option<String>,
    pub event_date: Option<Date>,
    pub budget_cents: Option<i64>,
    pub message: Option<String>,
    pub speaker_slug: Option<String>,
    pub source: Option<String>,
}
