//! Shared domain enumerations aligned with persisted database enums.
//!
//! The definitions live in `lectern-api-types` so request payloads and rows
//! agree on spelling; this module re-exports them for domain code.

pub use lectern_api_types::{
    ArticleStatus, CampaignStatus, ContractStatus, DealStage, SubscriberStatus, TaskPriority,
    TaskStatus, UnknownVariant, VendorCategory, WorkshopFormat,
};

/// Where an ingested article came from.
pub const OUTRANK_SOURCE: &str = "outrank";
