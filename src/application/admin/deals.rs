use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{
    ClientsRepo, CreateDealParams, DealQueryFilter, DealsRepo, RepoError, SpeakersRepo,
    UpdateDealParams,
};
use crate::domain::deals::{ClosedAtChange, validate_currency, validate_stage_change};
use crate::domain::entities::DealRecord;
use crate::domain::error::DomainError;
use crate::domain::types::DealStage;
use crate::domain::validate;
use lectern_api_types::{DealCreateRequest, DealUpdateRequest};

#[derive(Debug, Error)]
pub enum AdminDealError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("deal has {count} contracts")]
    HasContracts { count: u64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AdminDealService {
    deals: Arc<dyn DealsRepo>,
    clients: Arc<dyn ClientsRepo>,
    speakers: Arc<dyn SpeakersRepo>,
    audit: ActivityService,
}

impl AdminDealService {
    pub fn new(
        deals: Arc<dyn DealsRepo>,
        clients: Arc<dyn ClientsRepo>,
        speakers: Arc<dyn SpeakersRepo>,
        audit: ActivityService,
    ) -> Self {
        Self {
            deals,
            clients,
            speakers,
            audit,
        }
    }

    pub async fn list(
        &self,
        filter: &DealQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<DealRecord>, AdminDealError> {
        Ok(self.deals.list_deals(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<DealRecord, AdminDealError> {
        self.deals
            .find_deal(id)
            .await?
            .ok_or_else(|| DomainError::not_found("deal").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: DealCreateRequest,
    ) -> Result<DealRecord, AdminDealError> {
        self.ensure_client(request.client_id).await?;
        if let Some(speaker_id) = request.speaker_id {
            self.ensure_speaker(speaker_id).await?;
        }

        let params = CreateDealParams {
            client_id: request.client_id,
            speaker_id: request.speaker_id,
            event_name: validate::required("event_name", &request.event_name)?,
            event_date: request.event_date,
            event_location: validate::optional(request.event_location.as_deref()),
            value_cents: validate::non_negative("value_cents", request.value_cents)?,
            currency: validate_currency(&request.currency)?,
            stage: DealStage::Lead,
            notes: request.notes.trim().to_string(),
        };

        let deal = self.deals.create_deal(params).await?;
        self.log(actor, "deal.create", &deal).await?;
        Ok(deal)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: DealUpdateRequest,
    ) -> Result<DealRecord, AdminDealError> {
        self.get(id).await?;
        if let Some(speaker_id) = request.speaker_id {
            self.ensure_speaker(speaker_id).await?;
        }

        let params = UpdateDealParams {
            id,
            speaker_id: request.speaker_id,
            event_name: validate::required("event_name", &request.event_name)?,
            event_date: request.event_date,
            event_location: validate::optional(request.event_location.as_deref()),
            value_cents: validate::non_negative("value_cents", request.value_cents)?,
            currency: validate_currency(&request.currency)?,
            notes: request.notes.trim().to_string(),
        };

        let deal = self.deals.update_deal(params).await?;
        self.log(actor, "deal.update", &deal).await?;
        Ok(deal)
    }

    pub async fn change_stage(
        &self,
        actor: &str,
        id: Uuid,
        stage: DealStage,
    ) -> Result<DealRecord, AdminDealError> {
        let deal = self.get(id).await?;
        let change = validate_stage_change(deal.stage, stage)?;
        let closed_at = match change {
            ClosedAtChange::Set => Some(OffsetDateTime::now_utc()),
            ClosedAtChange::Clear => None,
            ClosedAtChange::Keep => deal.closed_at,
        };

        let updated = self.deals.set_deal_stage(id, stage, closed_at).await?;
        let payload = StageChange {
            from: deal.stage,
            to: stage,
        };
        self.audit
            .record(
                actor,
                "deal.stage",
                "deal",
                Some(&id.to_string()),
                Some(&payload),
            )
            .await?;
        Ok(updated)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminDealError> {
        let deal = self.get(id).await?;
        let count = self.deals.count_contracts_for_deal(id).await?;
        if count > 0 {
            return Err(AdminDealError::HasContracts { count });
        }

        self.deals.delete_deal(id).await?;
        self.log(actor, "deal.delete", &deal).await?;
        Ok(())
    }

    async fn ensure_client(&self, id: Uuid) -> Result<(), AdminDealError> {
        match self.clients.find_client(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("client").into()),
        }
    }

    async fn ensure_speaker(&self, id: Uuid) -> Result<(), AdminDealError> {
        match self.speakers.find_speaker(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("speaker").into()),
        }
    }

    async fn log(&self, actor: &str, action: &str, deal: &DealRecord) -> Result<(), AdminDealError> {
        let snapshot = DealSnapshot {
            event_name: &deal.event_name,
            stage: deal.stage,
            value_cents: deal.value_cents,
        };
        self.audit
            .record(
                actor,
                action,
                "deal",
                Some(&deal.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct DealSnapshot<'a> {
    event_name: &'a str,
    stage: DealStage,
    value_cents: i64,
}

#[derive(Debug, Serialize)]
struct StageChange {
    from: DealStage,
    to: DealStage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryStore, services};

    fn request(client_id: Uuid) -> DealCreateRequest {
        DealCreateRequest {
            client_id,
            speaker_id: None,
            event_name: "Annual kickoff".into(),
            event_date: None,
            event_location: None,
            value_cents: 1_500_000,
            currency: "eur".into(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn create_starts_as_lead_with_normalized_currency() {
        let store = MemoryStore::shared();
        let client = store.seed_client("buyer@corp.test");
        let deal = services(&store)
            .deals
            .create("admin", request(client.id))
            .await
            .unwrap();
        assert_eq!(deal.stage, DealStage::Lead);
        assert_eq!(deal.currency, "EUR");
    }

    #[tokio::test]
    async fn create_requires_existing_client() {
        let store = MemoryStore::shared();
        let err = services(&store)
            .deals
            .create("admin", request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdminDealError::Domain(DomainError::NotFound { entity: "client" })
        ));
    }

    #[tokio::test]
    async fn stage_changes_manage_closed_at() {
        let store = MemoryStore::shared();
        let client = store.seed_client("buyer@corp.test");
        let service = services(&store).deals;
        let deal = service.create("admin", request(client.id)).await.unwrap();

        let lost = service
            .change_stage("admin", deal.id, DealStage::Lost)
            .await
            .unwrap();
        assert!(lost.closed_at.is_some());

        let reopened = service
            .change_stage("admin", deal.id, DealStage::Lead)
            .await
            .unwrap();
        assert_eq!(reopened.closed_at, None);

        let won = service
            .change_stage("admin", deal.id, DealStage::Won)
            .await
            .unwrap();
        assert!(won.closed_at.is_some());

        let err = service
            .change_stage("admin", deal.id, DealStage::Negotiation)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdminDealError::Domain(DomainError::Transition { .. })
        ));
    }

    #[tokio::test]
    async fn delete_refuses_deals_with_contracts() {
        let store = MemoryStore::shared();
        let client = store.seed_client("buyer@corp.test");
        let service = services(&store).deals;
        let deal = service.create("admin", request(client.id)).await.unwrap();
        store.seed_contract(deal.id);

        assert!(matches!(
            service.delete("admin", deal.id).await,
            Err(AdminDealError::HasContracts { count: 1 })
        ));
    }
}
