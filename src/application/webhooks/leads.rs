//! Inbound CRM leads: client, deal and follow-up task in one call.

use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::repos::{
    ClientsRepo, CreateClientParams, CreateDealParams, DealsRepo, RepoError, SpeakersRepo,
    TaskParams, TasksRepo,
};
use crate::application::tokens::issue_token;
use crate::application::webhooks::WebhookError;
use crate::domain::entities::ClientRecord;
use crate::domain::types::{DealStage, TaskPriority};
use crate::domain::validate;
use lectern_api_types::LeadWebhookPayload;

const ACTOR: &str = "webhook:leads";
const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Serialize)]
pub struct LeadReceipt {
    pub client_id: Uuid,
    pub deal_id: Uuid,
    pub task_id: Uuid,
    pub created_client: bool,
}

pub struct LeadRepos {
    pub clients: Arc<dyn ClientsRepo>,
    pub speakers: Arc<dyn SpeakersRepo>,
    pub deals: Arc<dyn DealsRepo>,
    pub tasks: Arc<dyn TasksRepo>,
}

#[derive(Clone)]
pub struct LeadWebhookService {
    clients: Arc<dyn ClientsRepo>,
    speakers: Arc<dyn SpeakersRepo>,
    deals: Arc<dyn DealsRepo>,
    tasks: Arc<dyn TasksRepo>,
    audit: ActivityService,
}

impl LeadWebhookService {
    pub fn new(repos: LeadRepos, audit: ActivityService) -> Self {
        Self {
            clients: repos.clients,
            speakers: repos.speakers,
            deals: repos.deals,
            tasks: repos.tasks,
            audit,
        }
    }

    pub async fn receive(&self, lead: LeadWebhookPayload) -> Result<LeadReceipt, WebhookError> {
        let name = validate::required("name", &lead.name)?;
        let email = validate::email(&lead.email)?;
        let value_cents = validate::non_negative("budget_cents", lead.budget_cents.unwrap_or(0))?;

        let (client, created_client) = self.resolve_client(&name, &email, &lead).await?;
        let speaker_id = self.resolve_speaker(lead.speaker_slug.as_deref()).await?;

        let mut notes = String::new();
        if let Some(message) = validate::optional(lead.message.as_deref()) {
            notes.push_str(&message);
        }
        if let Some(source) = validate::optional(lead.source.as_deref()) {
            if !notes.is_empty() {
                notes.push_str("\n\n");
            }
            notes.push_str(&format!("Source: {source}"));
        }

        let deal = self
            .deals
            .create_deal(CreateDealParams {
                client_id: client.id,
                speaker_id,
                event_name: validate::optional(lead.event_name.as_deref())
                    .unwrap_or_else(|| format!("Inquiry from {name}")),
                event_date: lead.event_date,
                event_location: None,
                value_cents,
                currency: DEFAULT_CURRENCY.to_string(),
                stage: DealStage::Lead,
                notes,
            })
            .await?;

        let due_on = (OffsetDateTime::now_utc() + Duration::days(1)).date();
        let task = self
            .tasks
            .create_task(TaskParams {
                title: format!("Follow up with {name}"),
                description: format!("New lead for \"{}\" ({email}).", deal.event_name),
                priority: TaskPriority::High,
                due_on: Some(due_on),
                assignee: None,
                deal_id: Some(deal.id),
                client_id: Some(client.id),
            })
            .await?;

        let receipt = LeadReceipt {
            client_id: client.id,
            deal_id: deal.id,
            task_id: task.id,
            created_client,
        };
        self.audit
            .record(
                ACTOR,
                "lead.received",
                "deal",
                Some(&deal.id.to_string()),
                Some(&receipt),
            )
            .await?;
        metrics::counter!("lectern_leads_received_total").increment(1);
        info!(
            target = "lectern::webhooks::leads",
            deal = %deal.id,
            created_client,
            "lead received"
        );
        Ok(receipt)
    }

    async fn resolve_client(
        &self,
        name: &str,
        email: &str,
        lead: &LeadWebhookPayload,
    ) -> Result<(ClientRecord, bool), WebhookError> {
        if let Some(existing) = self.clients.find_client_by_email(email).await? {
            return Ok((existing, false));
        }

        let params = CreateClientParams {
            name: name.to_string(),
            email: email.to_string(),
            company: validate::optional(lead.company.as_deref()),
            phone: validate::optional(lead.phone.as_deref()),
            notes: String::new(),
            portal_token: issue_token(),
        };
        match self.clients.create_client(params).await {
            Ok(client) => {
                self.audit
                    .record(
                        ACTOR,
                        "client.create",
                        "client",
                        Some(&client.id.to_string()),
                        Some(&serde_json::json!({ "name": client.name, "email": client.email })),
                    )
                    .await?;
                Ok((client, true))
            }
            // Lost a race with another lead for the same address.
            Err(RepoError::Duplicate { .. }) => {
                let existing = self
                    .clients
                    .find_client_by_email(email)
                    .await?
                    .ok_or(RepoError::NotFound)?;
                Ok((existing, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn resolve_speaker(&self, slug: Option<&str>) -> Result<Option<Uuid>, WebhookError> {
        let Some(slug) = validate::optional(slug) else {
            return Ok(None);
        };
        match self.speakers.find_speaker_by_slug(&slug).await? {
            Some(speaker) => Ok(Some(speaker.id)),
            None => {
                warn!(
                    target = "lectern::webhooks::leads",
                    speaker_slug = %slug,
                    "lead names an unknown speaker; ignoring"
                );
                Ok(None)
            }
        }
    }
}
