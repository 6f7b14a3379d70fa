use std::sync::Arc;

use askama::Template;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{
    CampaignParams, CampaignsRepo, NewSubscriberParams, RepoError, SubscriberQueryFilter,
    SubscribersRepo,
};
use crate::application::tokens::issue_token;
use crate::domain::entities::{CampaignRecord, SubscriberRecord};
use crate::domain::error::DomainError;
use crate::domain::rich_text::RichDocument;
use crate::domain::types::{CampaignStatus, SubscriberStatus};
use crate::domain::validate;
use lectern_api_types::{CampaignCreateRequest, CampaignUpdateRequest, SubscribeRequest};

/// Placeholder the delivery provider swaps for each recipient's link.
pub const UNSUBSCRIBE_MERGE_TAG: &str = "*|UNSUB|*";
const SENDER_NAME: &str = "Lectern";
const PUBLIC_ACTOR: &str = "public";
const DEFAULT_SOURCE: &str = "website";

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("campaign has no active subscribers to send to")]
    NoRecipients,
    #[error("failed to render campaign email: {0}")]
    Template(#[from] askama::Error),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Template)]
#[template(path = "newsletter/campaign.html")]
struct CampaignEmailTemplate<'a> {
    subject: &'a str,
    preheader: Option<&'a str>,
    body_html: &'a str,
    sender: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Created,
    AlreadyActive,
    Reactivated,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResult {
    pub status: SubscriberStatus,
    pub outcome: SubscribeOutcome,
}

#[derive(Clone)]
pub struct NewsletterService {
    subscribers: Arc<dyn SubscribersRepo>,
    campaigns: Arc<dyn CampaignsRepo>,
    audit: ActivityService,
}

impl NewsletterService {
    pub fn new(
        subscribers: Arc<dyn SubscribersRepo>,
        campaigns: Arc<dyn CampaignsRepo>,
        audit: ActivityService,
    ) -> Self {
        Self {
            subscribers,
            campaigns,
            audit,
        }
    }

    /// Idempotent: an active address stays untouched, an unsubscribed one is
    /// reactivated.
    pub async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<SubscribeResult, NewsletterError> {
        let email = validate::email(&request.email)?;
        let name = validate::optional(request.name.as_deref());

        let (subscriber, outcome) = match self.subscribers.find_subscriber_by_email(&email).await? {
            Some(existing) if existing.status == SubscriberStatus::Active => {
                (existing, SubscribeOutcome::AlreadyActive)
            }
            Some(existing) => {
                let name = name.or(existing.name.clone());
                let subscriber = self
                    .subscribers
                    .reactivate_subscriber(existing.id, name)
                    .await?;
                (subscriber, SubscribeOutcome::Reactivated)
            }
            None => {
                let params = NewSubscriberParams {
                    email,
                    name,
                    source: validate::optional(request.source.as_deref())
                        .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                    unsubscribe_token: issue_token(),
                };
                match self.subscribers.insert_subscriber(params.clone()).await {
                    Ok(subscriber) => (subscriber, SubscribeOutcome::Created),
                    // A concurrent request inserted the same address first.
                    Err(RepoError::Duplicate { .. }) => {
                        let existing = self
                            .subscribers
                            .find_subscriber_by_email(&params.email)
                            .await?
                            .ok_or(RepoError::NotFound)?;
                        (existing, SubscribeOutcome::AlreadyActive)
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        if outcome != SubscribeOutcome::AlreadyActive {
            let action = match outcome {
                SubscribeOutcome::Created => "subscriber.create",
                _ => "subscriber.reactivate",
            };
            self.log_subscriber(PUBLIC_ACTOR, action, &subscriber)
                .await?;
        }

        Ok(SubscribeResult {
            status: subscriber.status,
            outcome,
        })
    }

    pub async fn unsubscribe(&self, token: &str) -> Result<SubscriberRecord, NewsletterError> {
        let subscriber = self
            .subscribers
            .unsubscribe_by_token(token, OffsetDateTime::now_utc())
            .await?
            .ok_or(DomainError::not_found("subscriber"))?;
        self.log_subscriber(PUBLIC_ACTOR, "subscriber.unsubscribe", &subscriber)
            .await?;
        Ok(subscriber)
    }

    pub async fn list_subscribers(
        &self,
        filter: &SubscriberQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<SubscriberRecord>, NewsletterError> {
        Ok(self.subscribers.list_subscribers(page, filter).await?)
    }

    pub async fn delete_subscriber(&self, actor: &str, id: Uuid) -> Result<(), NewsletterError> {
        self.subscribers
            .delete_subscriber(id)
            .await
            .map_err(|err| not_found(err, "subscriber"))?;
        self.audit
            .record(
                actor,
                "subscriber.delete",
                "subscriber",
                Some(&id.to_string()),
                Option::<&()>::None,
            )
            .await?;
        Ok(())
    }

    pub async fn list_campaigns(
        &self,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<CampaignRecord>, NewsletterError> {
        Ok(self.campaigns.list_campaigns(page).await?)
    }

    pub async fn get_campaign(&self, id: Uuid) -> Result<CampaignRecord, NewsletterError> {
        self.campaigns
            .find_campaign(id)
            .await?
            .ok_or_else(|| DomainError::not_found("campaign").into())
    }

    pub async fn create_campaign(
        &self,
        actor: &str,
        request: CampaignCreateRequest,
    ) -> Result<CampaignRecord, NewsletterError> {
        let campaign = self
            .campaigns
            .create_campaign(campaign_params(request)?)
            .await?;
        self.log_campaign(actor, "campaign.create", &campaign).await?;
        Ok(campaign)
    }

    pub async fn update_campaign(
        &self,
        actor: &str,
        id: Uuid,
        request: CampaignUpdateRequest,
    ) -> Result<CampaignRecord, NewsletterError> {
        self.draft(id).await?;
        let campaign = self
            .campaigns
            .update_campaign(id, campaign_params(request)?)
            .await?;
        self.log_campaign(actor, "campaign.update", &campaign).await?;
        Ok(campaign)
    }

    pub async fn delete_campaign(&self, actor: &str, id: Uuid) -> Result<(), NewsletterError> {
        let campaign = self.draft(id).await?;
        self.campaigns.delete_campaign(id).await?;
        self.log_campaign(actor, "campaign.delete", &campaign).await?;
        Ok(())
    }

    /// Email HTML as it would be stored on send.
    pub async fn preview_campaign(&self, id: Uuid) -> Result<String, NewsletterError> {
        let campaign = self.get_campaign(id).await?;
        if let Some(html) = campaign.rendered_html {
            return Ok(html);
        }
        render_campaign(&campaign)
    }

    /// Freeze the rendered email and the active-subscriber count. Delivery
    /// happens outside this service.
    pub async fn send_campaign(
        &self,
        actor: &str,
        id: Uuid,
    ) -> Result<CampaignRecord, NewsletterError> {
        let campaign = self.draft(id).await?;
        let recipients = self.subscribers.count_active_subscribers().await?;
        if recipients == 0 {
            return Err(NewsletterError::NoRecipients);
        }

        let html = render_campaign(&campaign)?;
        let recipient_count = i32::try_from(recipients).map_err(|_| {
            DomainError::invariant(format!("{recipients} recipients exceed the supported range"))
        })?;
        let sent = self
            .campaigns
            .mark_campaign_sent(id, &html, recipient_count, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| {
                DomainError::transition(
                    "campaign",
                    CampaignStatus::Sent.as_str(),
                    CampaignStatus::Sent.as_str(),
                )
            })?;

        metrics::counter!("lectern_campaigns_sent_total").increment(1);
        self.log_campaign(actor, "campaign.send", &sent).await?;
        Ok(sent)
    }

    async fn draft(&self, id: Uuid) -> Result<CampaignRecord, NewsletterError> {
        let campaign = self.get_campaign(id).await?;
        if campaign.status != CampaignStatus::Draft {
            return Err(DomainError::invariant("campaign has already been sent").into());
        }
        Ok(campaign)
    }

    async fn log_subscriber(
        &self,
        actor: &str,
        action: &str,
        subscriber: &SubscriberRecord,
    ) -> Result<(), NewsletterError> {
        self.audit
            .record(
                actor,
                action,
                "subscriber",
                Some(&subscriber.id.to_string()),
                Some(&serde_json::json!({ "email": subscriber.email })),
            )
            .await?;
        Ok(())
    }

    async fn log_campaign(
        &self,
        actor: &str,
        action: &str,
        campaign: &CampaignRecord,
    ) -> Result<(), NewsletterError> {
        let snapshot = CampaignSnapshot {
            subject: &campaign.subject,
            status: campaign.status,
            recipient_count: campaign.recipient_count,
        };
        self.audit
            .record(
                actor,
                action,
                "campaign",
                Some(&campaign.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

fn campaign_params(request: CampaignCreateRequest) -> Result<CampaignParams, NewsletterError> {
    Ok(CampaignParams {
        subject: validate::required("subject", &request.subject)?,
        preheader: validate::optional(request.preheader.as_deref()),
        body_markdown: request.body_markdown,
    })
}

fn render_campaign(campaign: &CampaignRecord) -> Result<String, NewsletterError> {
    let body_html = RichDocument::from_markdown(&campaign.body_markdown).render_html();
    let template = CampaignEmailTemplate {
        subject: &campaign.subject,
        preheader: campaign.preheader.as_deref(),
        body_html: &body_html,
        sender: SENDER_NAME,
        unsubscribe_url: UNSUBSCRIBE_MERGE_TAG,
    };
    Ok(template.render()?)
}

fn not_found(err: RepoError, entity: &'static str) -> NewsletterError {
    match err {
        RepoError::NotFound => DomainError::not_found(entity).into(),
        other => other.into(),
    }
}

#[derive(Debug, Serialize)]
struct CampaignSnapshot<'a> {
    subject: &'a str,
    status: CampaignStatus,
    recipient_count: i32,
}
