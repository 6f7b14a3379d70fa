//! Wiring of every application service over one repository backend.

use std::sync::Arc;

use url::Url;

use crate::application::admin::analytics::AnalyticsService;
use crate::application::admin::articles::AdminArticleService;
use crate::application::admin::audit::ActivityService;
use crate::application::admin::clients::AdminClientService;
use crate::application::admin::conferences::AdminConferenceService;
use crate::application::admin::contracts::ContractService;
use crate::application::admin::deals::AdminDealService;
use crate::application::admin::newsletter::NewsletterService;
use crate::application::admin::speakers::AdminSpeakerService;
use crate::application::admin::tasks::AdminTaskService;
use crate::application::admin::vendors::AdminVendorService;
use crate::application::admin::workshops::AdminWorkshopService;
use crate::application::directory::DirectoryService;
use crate::application::portal::{PortalRepos, PortalService};
use crate::application::repos::{
    ActivityRepo, AnalyticsRepo, ArticlesRepo, CampaignsRepo, ClientsRepo, ConferencesRepo,
    ContractsRepo, DealsRepo, HealthRepo, SpeakersRepo, SubscribersRepo, TasksRepo, VendorsRepo,
    WorkshopsRepo,
};
use crate::application::webhooks::leads::{LeadRepos, LeadWebhookService};
use crate::application::webhooks::outrank::OutrankWebhookService;

/// Every repository trait a backend must provide to run the service.
pub trait Repositories:
    HealthRepo
    + ClientsRepo
    + SpeakersRepo
    + DealsRepo
    + ContractsRepo
    + TasksRepo
    + SubscribersRepo
    + CampaignsRepo
    + ArticlesRepo
    + ConferencesRepo
    + WorkshopsRepo
    + VendorsRepo
    + AnalyticsRepo
    + 'static
{
}

impl<T> Repositories for T where
    T: HealthRepo
        + ClientsRepo
        + SpeakersRepo
        + DealsRepo
        + ContractsRepo
        + TasksRepo
        + SubscribersRepo
        + CampaignsRepo
        + ArticlesRepo
        + ConferencesRepo
        + WorkshopsRepo
        + VendorsRepo
        + AnalyticsRepo
        + 'static
{
}

#[derive(Clone)]
pub struct Services {
    pub health: Arc<dyn HealthRepo>,
    pub activity: ActivityService,
    pub clients: AdminClientService,
    pub speakers: AdminSpeakerService,
    pub deals: AdminDealService,
    pub contracts: ContractService,
    pub tasks: AdminTaskService,
    pub newsletter: NewsletterService,
    pub analytics: AnalyticsService,
    pub conferences: AdminConferenceService,
    pub workshops: AdminWorkshopService,
    pub vendors: AdminVendorService,
    pub articles: AdminArticleService,
    pub directory: DirectoryService,
    pub portal: PortalService,
    pub outrank: OutrankWebhookService,
    pub leads: LeadWebhookService,
}

impl Services {
    pub fn build<R: Repositories>(
        repos: Arc<R>,
        activity: Arc<dyn ActivityRepo>,
        public_base_url: Url,
    ) -> Self {
        let audit = ActivityService::new(activity);
        let speakers = AdminSpeakerService::new(repos.clone(), audit.clone());

        Self {
            health: repos.clone(),
            clients: AdminClientService::new(repos.clone(), audit.clone()),
            speakers: speakers.clone(),
            deals: AdminDealService::new(repos.clone(), repos.clone(), repos.clone(), audit.clone()),
            contracts: ContractService::new(repos.clone(), repos.clone(), audit.clone()),
            tasks: AdminTaskService::new(repos.clone(), audit.clone()),
            newsletter: NewsletterService::new(repos.clone(), repos.clone(), audit.clone()),
            analytics: AnalyticsService::new(repos.clone(), audit.clone()),
            conferences: AdminConferenceService::new(repos.clone(), audit.clone()),
            workshops: AdminWorkshopService::new(repos.clone(), repos.clone(), audit.clone()),
            vendors: AdminVendorService::new(repos.clone(), audit.clone()),
            articles: AdminArticleService::new(repos.clone(), audit.clone()),
            directory: DirectoryService::new(repos.clone(), repos.clone(), repos.clone()),
            portal: PortalService::new(
                PortalRepos {
                    clients: repos.clone(),
                    speakers: repos.clone(),
                    deals: repos.clone(),
                    contracts: repos.clone(),
                    workshops: repos.clone(),
                },
                speakers,
                public_base_url,
            ),
            outrank: OutrankWebhookService::new(repos.clone(), audit.clone()),
            leads: LeadWebhookService::new(
                LeadRepos {
                    clients: repos.clone(),
                    speakers: repos.clone(),
                    deals: repos.clone(),
                    tasks: repos,
                },
                audit.clone(),
            ),
            activity: audit,
        }
    }
}
