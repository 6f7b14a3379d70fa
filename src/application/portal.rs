//! Token-addressed client and speaker portals.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::Date;
use url::Url;
use uuid::Uuid;

use crate::application::admin::contracts::viewer_url;
use crate::application::admin::speakers::{AdminSpeakerError, AdminSpeakerService};
use crate::application::repos::{
    ClientsRepo, ContractsRepo, DealsRepo, RepoError, SpeakersRepo, WorkshopsRepo,
};
use crate::domain::entities::{ContractView, DealRecord, SpeakerRecord, WorkshopRecord};
use crate::domain::error::DomainError;
use crate::domain::types::{ContractStatus, DealStage, WorkshopFormat};
use lectern_api_types::SpeakerProfilePatch;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("portal not found")]
    NotFound,
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<AdminSpeakerError> for PortalError {
    fn from(err: AdminSpeakerError) -> Self {
        match err {
            AdminSpeakerError::Domain(DomainError::NotFound { .. }) => PortalError::NotFound,
            AdminSpeakerError::Domain(err) => PortalError::Domain(err),
            AdminSpeakerError::Repo(err) => PortalError::Repo(err),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalClient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalDeal {
    pub id: Uuid,
    pub event_name: String,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
    pub stage: DealStage,
}

impl From<DealRecord> for PortalDeal {
    fn from(deal: DealRecord) -> Self {
        Self {
            id: deal.id,
            event_name: deal.event_name,
            event_date: deal.event_date,
            event_location: deal.event_location,
            stage: deal.stage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalContract {
    pub id: Uuid,
    pub number: String,
    pub status: ContractStatus,
    pub fee_cents: i64,
    pub currency: String,
    pub event_name: String,
    pub speaker_name: Option<String>,
    pub viewer_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientPortal {
    pub client: PortalClient,
    pub deals: Vec<PortalDeal>,
    pub contracts: Vec<PortalContract>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalSpeaker {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub headline: String,
    pub bio: String,
    pub topics: Vec<String>,
    pub location: Option<String>,
}

impl From<SpeakerRecord> for PortalSpeaker {
    fn from(speaker: SpeakerRecord) -> Self {
        Self {
            id: speaker.id,
            name: speaker.name,
            slug: speaker.slug,
            headline: speaker.headline,
            bio: speaker.bio,
            topics: speaker.topics,
            location: speaker.location,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalWorkshop {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub format: WorkshopFormat,
    pub duration_minutes: i32,
}

impl From<WorkshopRecord> for PortalWorkshop {
    fn from(workshop: WorkshopRecord) -> Self {
        Self {
            id: workshop.id,
            slug: workshop.slug,
            title: workshop.title,
            format: workshop.format,
            duration_minutes: workshop.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeakerPortal {
    pub speaker: PortalSpeaker,
    pub engagements: Vec<PortalDeal>,
    pub workshops: Vec<PortalWorkshop>,
}

#[derive(Clone)]
pub struct PortalService {
    clients: Arc<dyn ClientsRepo>,
    speakers: Arc<dyn SpeakersRepo>,
    deals: Arc<dyn DealsRepo>,
    contracts: Arc<dyn ContractsRepo>,
    workshops: Arc<dyn WorkshopsRepo>,
    profile_editor: AdminSpeakerService,
    public_base_url: Url,
}

pub struct PortalRepos {
    pub clients: Arc<dyn ClientsRepo>,
    pub speakers: Arc<dyn SpeakersRepo>,
    pub deals: Arc<dyn DealsRepo>,
    pub contracts: Arc<dyn ContractsRepo>,
    pub workshops: Arc<dyn WorkshopsRepo>,
}

impl PortalService {
    pub fn new(repos: PortalRepos, profile_editor: AdminSpeakerService, public_base_url: Url) -> Self {
        Self {
            clients: repos.clients,
            speakers: repos.speakers,
            deals: repos.deals,
            contracts: repos.contracts,
            workshops: repos.workshops,
            profile_editor,
            public_base_url,
        }
    }

    pub async fn client_portal(&self, token: &str) -> Result<ClientPortal, PortalError> {
        let client = self
            .clients
            .find_client_by_portal_token(token)
            .await?
            .ok_or(PortalError::NotFound)?;

        let deals = self
            .deals
            .list_deals_for_client(client.id)
            .await?
            .into_iter()
            .map(PortalDeal::from)
            .collect();
        let contracts = self
            .contracts
            .list_visible_contracts_for_client(client.id)
            .await?
            .into_iter()
            .map(|view| self.portal_contract(view))
            .collect();

        Ok(ClientPortal {
            client: PortalClient {
                id: client.id,
                name: client.name,
                email: client.email,
                company: client.company,
            },
            deals,
            contracts,
        })
    }

    pub async fn speaker_portal(&self, token: &str) -> Result<SpeakerPortal, PortalError> {
        let speaker = self.active_speaker(token).await?;
        let engagements = self
            .deals
            .list_engagements_for_speaker(speaker.id)
            .await?
            .into_iter()
            .map(PortalDeal::from)
            .collect();
        let workshops = self
            .workshops
            .list_published_workshops_for_speaker(speaker.id)
            .await?
            .into_iter()
            .map(PortalWorkshop::from)
            .collect();

        Ok(SpeakerPortal {
            speaker: speaker.into(),
            engagements,
            workshops,
        })
    }

    pub async fn update_speaker_profile(
        &self,
        token: &str,
        patch: SpeakerProfilePatch,
    ) -> Result<PortalSpeaker, PortalError> {
        let speaker = self.active_speaker(token).await?;
        let updated = self.profile_editor.apply_profile_patch(&speaker, patch).await?;
        Ok(updated.into())
    }

    async fn active_speaker(&self, token: &str) -> Result<SpeakerRecord, PortalError> {
        match self.speakers.find_speaker_by_portal_token(token).await? {
            Some(speaker) if speaker.active => Ok(speaker),
            _ => Err(PortalError::NotFound),
        }
    }

    fn portal_contract(&self, view: ContractView) -> PortalContract {
        let ContractView {
            contract,
            speaker_name,
            event_name,
            ..
        } = view;
        PortalContract {
            viewer_url: viewer_url(&self.public_base_url, &contract.view_token),
            id: contract.id,
            number: contract.number,
            status: contract.status,
            fee_cents: contract.fee_cents,
            currency: contract.currency,
            event_name,
            speaker_name,
        }
    }
}
