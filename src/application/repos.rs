//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::application::pagination::{
    CursorPage, DateCursor, DueCursor, PageRequest, PaginationError, TimeCursor,
};
use crate::domain::entities::{
    ActivityRecord, ArticleRecord, ArticleSummary, CampaignRecord, ClientRecord, ConferenceRecord,
    ContractRecord, ContractView, DealRecord, SpeakerRecord, SubscriberRecord, TaskRecord,
    VendorRecord, WorkshopListing, WorkshopRecord,
};
use crate::domain::types::{
    ArticleStatus, ContractStatus, DealStage, SubscriberStatus, TaskPriority, TaskStatus,
    VendorCategory, WorkshopFormat,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

// -------- Activity log --------

#[derive(Debug, Clone, Default)]
pub struct ActivityQueryFilter {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub search: Option<String>,
}

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    async fn append_activity(&self, record: ActivityRecord) -> Result<(), RepoError>;
    async fn list_activity(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ActivityQueryFilter,
    ) -> Result<CursorPage<ActivityRecord>, RepoError>;
}

// -------- Clients --------

#[derive(Debug, Clone, Default)]
pub struct ClientQueryFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateClientParams {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: String,
    pub portal_token: String,
}

#[derive(Debug, Clone)]
pub struct UpdateClientParams {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: String,
}

#[async_trait]
pub trait ClientsRepo: Send + Sync {
    async fn create_client(&self, params: CreateClientParams) -> Result<ClientRecord, RepoError>;
    async fn update_client(&self, params: UpdateClientParams) -> Result<ClientRecord, RepoError>;
    async fn find_client(&self, id: Uuid) -> Result<Option<ClientRecord>, RepoError>;
    async fn find_client_by_email(&self, email: &str) -> Result<Option<ClientRecord>, RepoError>;
    async fn find_client_by_portal_token(
        &self,
        token: &str,
    ) -> Result<Option<ClientRecord>, RepoError>;
    async fn list_clients(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ClientQueryFilter,
    ) -> Result<CursorPage<ClientRecord>, RepoError>;
    async fn count_deals_for_client(&self, id: Uuid) -> Result<u64, RepoError>;
    async fn delete_client(&self, id: Uuid) -> Result<(), RepoError>;
    async fn set_client_portal_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<ClientRecord, RepoError>;
}

// -------- Speakers --------

#[derive(Debug, Clone, Default)]
pub struct SpeakerQueryFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SpeakerParams {
    pub name: String,
    pub email: Option<String>,
    pub headline: String,
    pub bio: String,
    pub topics: Vec<String>,
    pub location: Option<String>,
    pub fee_min_cents: Option<i64>,
    pub fee_max_cents: Option<i64>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct SpeakerProfileParams {
    pub headline: String,
    pub bio: String,
    pub topics: Vec<String>,
    pub location: Option<String>,
}

#[async_trait]
pub trait SpeakersRepo: Send + Sync {
    async fn create_speaker(
        &self,
        slug: &str,
        portal_token: &str,
        params: SpeakerParams,
    ) -> Result<SpeakerRecord, RepoError>;
    async fn update_speaker(
        &self,
        id: Uuid,
        params: SpeakerParams,
    ) -> Result<SpeakerRecord, RepoError>;
    async fn update_speaker_profile(
        &self,
        id: Uuid,
        params: SpeakerProfileParams,
    ) -> Result<SpeakerRecord, RepoError>;
    async fn find_speaker(&self, id: Uuid) -> Result<Option<SpeakerRecord>, RepoError>;
    async fn find_speaker_by_slug(&self, slug: &str) -> Result<Option<SpeakerRecord>, RepoError>;
    async fn find_speaker_by_portal_token(
        &self,
        token: &str,
    ) -> Result<Option<SpeakerRecord>, RepoError>;
    async fn speaker_slug_taken(&self, slug: &str) -> Result<bool, RepoError>;
    async fn list_speakers(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &SpeakerQueryFilter,
    ) -> Result<CursorPage<SpeakerRecord>, RepoError>;
    async fn set_speaker_active(&self, id: Uuid, active: bool)
    -> Result<SpeakerRecord, RepoError>;
    async fn set_speaker_portal_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<SpeakerRecord, RepoError>;
}

// -------- Deals --------

#[derive(Debug, Clone, Default)]
pub struct DealQueryFilter {
    pub stage: Option<DealStage>,
    pub client_id: Option<Uuid>,
    pub speaker_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateDealParams {
    pub client_id: Uuid,
    pub speaker_id: Option<Uuid>,
    pub event_name: String,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
    pub value_cents: i64,
    pub currency: String,
    pub stage: DealStage,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct UpdateDealParams {
    pub id: Uuid,
    pub speaker_id: Option<Uuid>,
    pub event_name: String,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
    pub value_cents: i64,
    pub currency: String,
    pub notes: String,
}

#[async_trait]
pub trait DealsRepo: Send + Sync {
    async fn create_deal(&self, params: CreateDealParams) -> Result<DealRecord, RepoError>;
    async fn update_deal(&self, params: UpdateDealParams) -> Result<DealRecord, RepoError>;
    async fn set_deal_stage(
        &self,
        id: Uuid,
        stage: DealStage,
        closed_at: Option<OffsetDateTime>,
    ) -> Result<DealRecord, RepoError>;
    async fn find_deal(&self, id: Uuid) -> Result<Option<DealRecord>, RepoError>;
    async fn list_deals(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &DealQueryFilter,
    ) -> Result<CursorPage<DealRecord>, RepoError>;
    async fn list_deals_for_client(&self, client_id: Uuid) -> Result<Vec<DealRecord>, RepoError>;
    /// Deals in `negotiation` or `won` for the speaker, soonest event first.
    async fn list_engagements_for_speaker(
        &self,
        speaker_id: Uuid,
    ) -> Result<Vec<DealRecord>, RepoError>;
    async fn count_contracts_for_deal(&self, id: Uuid) -> Result<u64, RepoError>;
    async fn delete_deal(&self, id: Uuid) -> Result<(), RepoError>;
}

// -------- Contracts --------

#[derive(Debug, Clone, Default)]
pub struct ContractQueryFilter {
    pub status: Option<ContractStatus>,
    pub deal_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateContractParams {
    pub deal_id: Uuid,
    pub number: String,
    pub fee_cents: i64,
    pub currency: String,
    pub terms: String,
    pub view_token: String,
}

#[async_trait]
pub trait ContractsRepo: Send + Sync {
    async fn count_contracts_numbered_in_year(&self, year: i32) -> Result<u64, RepoError>;
    async fn create_contract(
        &self,
        params: CreateContractParams,
    ) -> Result<ContractRecord, RepoError>;
    /// Rewrite fee and terms while the contract is still a draft.
    async fn update_contract_terms(
        &self,
        id: Uuid,
        fee_cents: i64,
        currency: &str,
        terms: &str,
    ) -> Result<Option<ContractRecord>, RepoError>;
    /// Move a draft to `sent`; `None` when it is no longer a draft.
    async fn mark_contract_sent(
        &self,
        id: Uuid,
        sent_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<Option<ContractRecord>, RepoError>;
    /// Move a contract to `status` only if it is currently `expected`.
    async fn transition_contract(
        &self,
        id: Uuid,
        expected: ContractStatus,
        status: ContractStatus,
    ) -> Result<Option<ContractRecord>, RepoError>;
    async fn sign_contract(
        &self,
        id: Uuid,
        signer_name: &str,
        signed_at: OffsetDateTime,
    ) -> Result<Option<ContractRecord>, RepoError>;
    async fn find_contract(&self, id: Uuid) -> Result<Option<ContractRecord>, RepoError>;
    async fn find_contract_view_by_token(
        &self,
        token: &str,
    ) -> Result<Option<ContractView>, RepoError>;
    async fn list_contracts(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ContractQueryFilter,
    ) -> Result<CursorPage<ContractRecord>, RepoError>;
    async fn list_visible_contracts_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ContractView>, RepoError>;
    async fn list_overdue_sent_contracts(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ContractRecord>, RepoError>;
}

// -------- Tasks --------

#[derive(Debug, Clone, Default)]
pub struct TaskQueryFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub priority: Option<TaskPriority>,
    pub deal_id: Option<Uuid>,
    /// Only tasks that are not done and due strictly before this date.
    pub overdue_before: Option<Date>,
}

#[derive(Debug, Clone)]
pub struct TaskParams {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub due_on: Option<Date>,
    pub assignee: Option<String>,
    pub deal_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[async_trait]
pub trait TasksRepo: Send + Sync {
    async fn create_task(&self, params: TaskParams) -> Result<TaskRecord, RepoError>;
    async fn update_task(&self, id: Uuid, params: TaskParams) -> Result<TaskRecord, RepoError>;
    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<OffsetDateTime>,
    ) -> Result<TaskRecord, RepoError>;
    async fn find_task(&self, id: Uuid) -> Result<Option<TaskRecord>, RepoError>;
    async fn list_tasks(
        &self,
        page: PageRequest<DueCursor>,
        filter: &TaskQueryFilter,
    ) -> Result<CursorPage<TaskRecord>, RepoError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), RepoError>;
}

// -------- Newsletter --------

#[derive(Debug, Clone, Default)]
pub struct SubscriberQueryFilter {
    pub status: Option<SubscriberStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSubscriberParams {
    pub email: String,
    pub name: Option<String>,
    pub source: String,
    pub unsubscribe_token: String,
}

#[derive(Debug, Clone)]
pub struct CampaignParams {
    pub subject: String,
    pub preheader: Option<String>,
    pub body_markdown: String,
}

#[async_trait]
pub trait SubscribersRepo: Send + Sync {
    async fn find_subscriber_by_email(
        &self,
        email: &str,
    ) -> Result<Option<SubscriberRecord>, RepoError>;
    async fn insert_subscriber(
        &self,
        params: NewSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError>;
    async fn reactivate_subscriber(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> Result<SubscriberRecord, RepoError>;
    async fn unsubscribe_by_token(
        &self,
        token: &str,
        at: OffsetDateTime,
    ) -> Result<Option<SubscriberRecord>, RepoError>;
    async fn list_subscribers(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &SubscriberQueryFilter,
    ) -> Result<CursorPage<SubscriberRecord>, RepoError>;
    async fn count_active_subscribers(&self) -> Result<u64, RepoError>;
    async fn delete_subscriber(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CampaignsRepo: Send + Sync {
    async fn create_campaign(&self, params: CampaignParams) -> Result<CampaignRecord, RepoError>;
    async fn update_campaign(
        &self,
        id: Uuid,
        params: CampaignParams,
    ) -> Result<CampaignRecord, RepoError>;
    async fn find_campaign(&self, id: Uuid) -> Result<Option<CampaignRecord>, RepoError>;
    async fn list_campaigns(
        &self,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<CampaignRecord>, RepoError>;
    async fn delete_campaign(&self, id: Uuid) -> Result<(), RepoError>;
    /// Store the rendered email and recipient snapshot if still a draft.
    async fn mark_campaign_sent(
        &self,
        id: Uuid,
        rendered_html: &str,
        recipient_count: i32,
        sent_at: OffsetDateTime,
    ) -> Result<Option<CampaignRecord>, RepoError>;
}

// -------- Articles --------

#[derive(Debug, Clone, Default)]
pub struct ArticleQueryFilter {
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpsertArticleParams {
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
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// True when another article (not `source`/`external_id`) owns `slug`.
    async fn article_slug_taken(
        &self,
        slug: &str,
        source: &str,
        external_id: &str,
    ) -> Result<bool, RepoError>;
    async fn upsert_article(
        &self,
        params: UpsertArticleParams,
    ) -> Result<(ArticleRecord, UpsertOutcome), RepoError>;
    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError>;
    async fn find_published_article_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ArticleRecord>, RepoError>;
    async fn list_articles(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ArticleQueryFilter,
    ) -> Result<CursorPage<ArticleSummary>, RepoError>;
    async fn set_article_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
    ) -> Result<ArticleRecord, RepoError>;
    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError>;
}

// -------- Conferences --------

#[derive(Debug, Clone, Default)]
pub struct ConferenceQueryFilter {
    pub published_only: bool,
    pub search: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    /// Only conferences ending on or after this date.
    pub ending_from: Option<Date>,
}

#[derive(Debug, Clone)]
pub struct ConferenceParams {
    pub name: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub country: String,
    pub starts_on: Date,
    pub ends_on: Date,
    pub website_url: Option<String>,
    pub cfp_deadline: Option<Date>,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[async_trait]
pub trait ConferencesRepo: Send + Sync {
    async fn create_conference(
        &self,
        slug: &str,
        params: ConferenceParams,
    ) -> Result<ConferenceRecord, RepoError>;
    async fn update_conference(
        &self,
        id: Uuid,
        params: ConferenceParams,
    ) -> Result<ConferenceRecord, RepoError>;
    async fn find_conference(&self, id: Uuid) -> Result<Option<ConferenceRecord>, RepoError>;
    async fn find_published_conference_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ConferenceRecord>, RepoError>;
    async fn conference_slug_taken(&self, slug: &str) -> Result<bool, RepoError>;
    async fn list_conferences(
        &self,
        page: PageRequest<DateCursor>,
        filter: &ConferenceQueryFilter,
    ) -> Result<CursorPage<ConferenceRecord>, RepoError>;
    async fn conference_categories(
        &self,
        ending_from: Option<Date>,
    ) -> Result<Vec<CategoryCount>, RepoError>;
    async fn delete_conference(&self, id: Uuid) -> Result<(), RepoError>;
}

// -------- Workshops --------

#[derive(Debug, Clone, Default)]
pub struct WorkshopQueryFilter {
    pub published_only: bool,
    pub format: Option<WorkshopFormat>,
    pub speaker_slug: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkshopParams {
    pub title: String,
    pub speaker_id: Uuid,
    pub summary: String,
    pub format: WorkshopFormat,
    pub duration_minutes: i32,
    pub price_cents: Option<i64>,
    pub published: bool,
}

#[async_trait]
pub trait WorkshopsRepo: Send + Sync {
    async fn create_workshop(
        &self,
        slug: &str,
        params: WorkshopParams,
    ) -> Result<WorkshopRecord, RepoError>;
    async fn update_workshop(
        &self,
        id: Uuid,
        params: WorkshopParams,
    ) -> Result<WorkshopRecord, RepoError>;
    async fn find_workshop(&self, id: Uuid) -> Result<Option<WorkshopRecord>, RepoError>;
    async fn find_published_workshop_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<WorkshopListing>, RepoError>;
    async fn workshop_slug_taken(&self, slug: &str) -> Result<bool, RepoError>;
    async fn list_workshops(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &WorkshopQueryFilter,
    ) -> Result<CursorPage<WorkshopListing>, RepoError>;
    async fn list_published_workshops_for_speaker(
        &self,
        speaker_id: Uuid,
    ) -> Result<Vec<WorkshopRecord>, RepoError>;
    async fn delete_workshop(&self, id: Uuid) -> Result<(), RepoError>;
}

// -------- Vendors --------

#[derive(Debug, Clone, Default)]
pub struct VendorQueryFilter {
    pub category: Option<VendorCategory>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VendorParams {
    pub name: String,
    pub category: VendorCategory,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<i16>,
    pub notes: String,
    pub active: bool,
}

#[async_trait]
pub trait VendorsRepo: Send + Sync {
    async fn create_vendor(&self, params: VendorParams) -> Result<VendorRecord, RepoError>;
    async fn update_vendor(&self, id: Uuid, params: VendorParams)
    -> Result<VendorRecord, RepoError>;
    async fn find_vendor(&self, id: Uuid) -> Result<Option<VendorRecord>, RepoError>;
    async fn list_vendors(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &VendorQueryFilter,
    ) -> Result<CursorPage<VendorRecord>, RepoError>;
    async fn delete_vendor(&self, id: Uuid) -> Result<(), RepoError>;
}

// -------- Analytics --------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTotal {
    pub stage: DealStage,
    pub count: u64,
    pub value_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClosedDealTotals {
    pub won_count: u64,
    pub won_cents: i64,
    pub lost_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriberTotals {
    pub active: u64,
    pub unsubscribed: u64,
    pub new_in_range: u64,
}

#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn deal_stage_totals(&self) -> Result<Vec<StageTotal>, RepoError>;
    async fn closed_deal_totals(
        &self,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<ClosedDealTotals, RepoError>;
    async fn task_status_counts(&self) -> Result<Vec<(TaskStatus, u64)>, RepoError>;
    async fn overdue_task_count(&self, today: Date) -> Result<u64, RepoError>;
    async fn contract_status_counts(&self) -> Result<Vec<(ContractStatus, u64)>, RepoError>;
    async fn subscriber_totals(
        &self,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<SubscriberTotals, RepoError>;
}
