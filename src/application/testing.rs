//! In-memory repositories backing the service unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use url::Url;
use uuid::Uuid;

pub use crate::application::context::Services;
use crate::application::admin::audit::testing::MemoryActivityRepo;
use crate::application::pagination::{CursorPage, DateCursor, DueCursor, PageRequest, TimeCursor};
use crate::application::repos::*;
use crate::application::tokens::issue_token;
use crate::domain::entities::*;
use crate::domain::types::*;

#[derive(Default)]
struct State {
    clients: Vec<ClientRecord>,
    speakers: Vec<SpeakerRecord>,
    deals: Vec<DealRecord>,
    contracts: Vec<ContractRecord>,
    tasks: Vec<TaskRecord>,
    subscribers: Vec<SubscriberRecord>,
    campaigns: Vec<CampaignRecord>,
    articles: Vec<ArticleRecord>,
    conferences: Vec<ConferenceRecord>,
    workshops: Vec<WorkshopRecord>,
    vendors: Vec<VendorRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    pub activity: Arc<MemoryActivityRepo>,
}

pub fn services(store: &Arc<MemoryStore>) -> Services {
    let base = Url::parse("http://portal.test/").unwrap();
    Services::build(store.clone(), store.activity.clone(), base)
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn page_of<T>(items: Vec<T>, limit: u32) -> CursorPage<T> {
    let mut items = items;
    items.truncate(limit as usize);
    CursorPage::new(items, None)
}

fn matches_search(search: &Option<String>, fields: &[&String]) -> bool {
    match search {
        Some(needle) => {
            let needle = needle.to_lowercase();
            fields
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        }
        None => true,
    }
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_client(&self, email: &str) -> ClientRecord {
        let record = ClientRecord {
            id: Uuid::new_v4(),
            name: email.to_string(),
            email: email.to_lowercase(),
            company: None,
            phone: None,
            notes: String::new(),
            portal_token: issue_token(),
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().clients.push(record.clone());
        record
    }

    pub fn seed_speaker(&self, name: &str) -> SpeakerRecord {
        let record = SpeakerRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug::slugify(name),
            email: None,
            headline: String::new(),
            bio: String::new(),
            topics: Vec::new(),
            location: None,
            fee_min_cents: None,
            fee_max_cents: None,
            active: true,
            portal_token: issue_token(),
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().speakers.push(record.clone());
        record
    }

    pub fn seed_deal(&self, client_id: Uuid, speaker_id: Option<Uuid>) -> DealRecord {
        let record = DealRecord {
            id: Uuid::new_v4(),
            client_id,
            speaker_id,
            event_name: "Leadership offsite".into(),
            event_date: None,
            event_location: None,
            value_cents: 1_000_000,
            currency: "USD".into(),
            stage: DealStage::Lead,
            notes: String::new(),
            closed_at: None,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().deals.push(record.clone());
        record
    }

    pub fn seed_contract(&self, deal_id: Uuid) -> ContractRecord {
        let record = ContractRecord {
            id: Uuid::new_v4(),
            deal_id,
            number: format!("CT-SEED-{}", Uuid::new_v4().simple()),
            fee_cents: 0,
            currency: "USD".into(),
            terms: String::new(),
            status: ContractStatus::Draft,
            view_token: issue_token(),
            sent_at: None,
            expires_at: None,
            signed_at: None,
            signer_name: None,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().contracts.push(record.clone());
        record
    }

    pub fn seed_article(&self, slug: &str) -> ArticleRecord {
        let record = ArticleRecord {
            id: Uuid::new_v4(),
            source: OUTRANK_SOURCE.into(),
            external_id: format!("seed-{slug}"),
            slug: slug.to_string(),
            title: slug.replace('-', " "),
            meta_description: None,
            image_url: None,
            tags: Vec::new(),
            body_markdown: "Body".into(),
            body_json: serde_json::json!([]),
            body_html: "<p>Body</p>".into(),
            word_count: 1,
            reading_minutes: 1,
            status: ArticleStatus::Published,
            published_at: now(),
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().articles.push(record.clone());
        record
    }

    pub fn close_deal(&self, id: Uuid, stage: DealStage, at: OffsetDateTime) {
        let mut state = self.state.lock().unwrap();
        if let Some(deal) = state.deals.iter_mut().find(|deal| deal.id == id) {
            deal.stage = stage;
            deal.closed_at = Some(at);
        }
    }

    pub fn deal(&self, id: Uuid) -> Option<DealRecord> {
        let state = self.state.lock().unwrap();
        state.deals.iter().find(|deal| deal.id == id).cloned()
    }

    pub fn task(&self, id: Uuid) -> Option<TaskRecord> {
        let state = self.state.lock().unwrap();
        state.tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn subscriber_token(&self, email: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .subscribers
            .iter()
            .find(|subscriber| subscriber.email == email)
            .map(|subscriber| subscriber.unsubscribe_token.clone())
    }

    pub fn article_by_external(&self, external_id: &str) -> Option<ArticleRecord> {
        let state = self.state.lock().unwrap();
        state
            .articles
            .iter()
            .find(|article| article.external_id == external_id)
            .cloned()
    }

    fn contract_view(state: &State, contract: &ContractRecord) -> Option<ContractView> {
        let deal = state.deals.iter().find(|deal| deal.id == contract.deal_id)?;
        let client = state.clients.iter().find(|client| client.id == deal.client_id)?;
        let speaker_name = deal.speaker_id.and_then(|id| {
            state
                .speakers
                .iter()
                .find(|speaker| speaker.id == id)
                .map(|speaker| speaker.name.clone())
        });
        Some(ContractView {
            contract: contract.clone(),
            client_name: client.name.clone(),
            speaker_name,
            event_name: deal.event_name.clone(),
            event_date: deal.event_date,
            event_location: deal.event_location.clone(),
        })
    }

    fn listing(state: &State, workshop: &WorkshopRecord) -> Option<WorkshopListing> {
        let speaker = state
            .speakers
            .iter()
            .find(|speaker| speaker.id == workshop.speaker_id)?;
        Some(WorkshopListing {
            workshop: workshop.clone(),
            speaker_name: speaker.name.clone(),
            speaker_slug: speaker.slug.clone(),
        })
    }
}

macro_rules! update_in {
    ($items:expr, $id:expr, |$record:ident| $body:block) => {{
        match $items.iter_mut().find(|item| item.id == $id) {
            Some($record) => {
                $body
                $record.updated_at = now();
                Ok($record.clone())
            }
            None => Err(RepoError::NotFound),
        }
    }};
}

fn draft_contract(contracts: &mut [ContractRecord], id: Uuid) -> Option<&mut ContractRecord> {
    contracts
        .iter_mut()
        .find(|contract| contract.id == id && contract.status == ContractStatus::Draft)
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
impl ClientsRepo for MemoryStore {
    async fn create_client(&self, params: CreateClientParams) -> Result<ClientRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state.clients.iter().any(|client| client.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "clients_email_key".into(),
            });
        }
        let record = ClientRecord {
            id: Uuid::new_v4(),
            name: params.name,
            email: params.email,
            company: params.company,
            phone: params.phone,
            notes: params.notes,
            portal_token: params.portal_token,
            created_at: now(),
            updated_at: now(),
        };
        state.clients.push(record.clone());
        Ok(record)
    }

    async fn update_client(&self, params: UpdateClientParams) -> Result<ClientRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.clients, params.id, |client| {
            client.name = params.name;
            client.email = params.email;
            client.company = params.company;
            client.phone = params.phone;
            client.notes = params.notes;
        })
    }

    async fn find_client(&self, id: Uuid) -> Result<Option<ClientRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.clients.iter().find(|client| client.id == id).cloned())
    }

    async fn find_client_by_email(&self, email: &str) -> Result<Option<ClientRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .clients
            .iter()
            .find(|client| client.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_client_by_portal_token(
        &self,
        token: &str,
    ) -> Result<Option<ClientRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .clients
            .iter()
            .find(|client| client.portal_token == token)
            .cloned())
    }

    async fn list_clients(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ClientQueryFilter,
    ) -> Result<CursorPage<ClientRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .clients
            .iter()
            .rev()
            .filter(|client| matches_search(&filter.search, &[&client.name, &client.email]))
            .cloned()
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn count_deals_for_client(&self, id: Uuid) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.deals.iter().filter(|deal| deal.client_id == id).count() as u64)
    }

    async fn delete_client(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().clients.retain(|client| client.id != id);
        Ok(())
    }

    async fn set_client_portal_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<ClientRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.clients, id, |client| {
            client.portal_token = token.to_string();
        })
    }
}

#[async_trait]
impl SpeakersRepo for MemoryStore {
    async fn create_speaker(
        &self,
        slug: &str,
        portal_token: &str,
        params: SpeakerParams,
    ) -> Result<SpeakerRecord, RepoError> {
        let record = SpeakerRecord {
            id: Uuid::new_v4(),
            name: params.name,
            slug: slug.to_string(),
            email: params.email,
            headline: params.headline,
            bio: params.bio,
            topics: params.topics,
            location: params.location,
            fee_min_cents: params.fee_min_cents,
            fee_max_cents: params.fee_max_cents,
            active: params.active,
            portal_token: portal_token.to_string(),
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().speakers.push(record.clone());
        Ok(record)
    }

    async fn update_speaker(
        &self,
        id: Uuid,
        params: SpeakerParams,
    ) -> Result<SpeakerRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.speakers, id, |speaker| {
            speaker.name = params.name;
            speaker.email = params.email;
            speaker.headline = params.headline;
            speaker.bio = params.bio;
            speaker.topics = params.topics;
            speaker.location = params.location;
            speaker.fee_min_cents = params.fee_min_cents;
            speaker.fee_max_cents = params.fee_max_cents;
            speaker.active = params.active;
        })
    }

    async fn update_speaker_profile(
        &self,
        id: Uuid,
        params: SpeakerProfileParams,
    ) -> Result<SpeakerRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.speakers, id, |speaker| {
            speaker.headline = params.headline;
            speaker.bio = params.bio;
            speaker.topics = params.topics;
            speaker.location = params.location;
        })
    }

    async fn find_speaker(&self, id: Uuid) -> Result<Option<SpeakerRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.speakers.iter().find(|speaker| speaker.id == id).cloned())
    }

    async fn find_speaker_by_slug(&self, slug: &str) -> Result<Option<SpeakerRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.speakers.iter().find(|speaker| speaker.slug == slug).cloned())
    }

    async fn find_speaker_by_portal_token(
        &self,
        token: &str,
    ) -> Result<Option<SpeakerRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .speakers
            .iter()
            .find(|speaker| speaker.portal_token == token)
            .cloned())
    }

    async fn speaker_slug_taken(&self, slug: &str) -> Result<bool, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.speakers.iter().any(|speaker| speaker.slug == slug))
    }

    async fn list_speakers(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &SpeakerQueryFilter,
    ) -> Result<CursorPage<SpeakerRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .speakers
            .iter()
            .rev()
            .filter(|speaker| filter.active.is_none_or(|active| speaker.active == active))
            .filter(|speaker| matches_search(&filter.search, &[&speaker.name, &speaker.headline]))
            .cloned()
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn set_speaker_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<SpeakerRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.speakers, id, |speaker| {
            speaker.active = active;
        })
    }

    async fn set_speaker_portal_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<SpeakerRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.speakers, id, |speaker| {
            speaker.portal_token = token.to_string();
        })
    }
}

#[async_trait]
impl DealsRepo for MemoryStore {
    async fn create_deal(&self, params: CreateDealParams) -> Result<DealRecord, RepoError> {
        let record = DealRecord {
            id: Uuid::new_v4(),
            client_id: params.client_id,
            speaker_id: params.speaker_id,
            event_name: params.event_name,
            event_date: params.event_date,
            event_location: params.event_location,
            value_cents: params.value_cents,
            currency: params.currency,
            stage: params.stage,
            notes: params.notes,
            closed_at: None,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().deals.push(record.clone());
        Ok(record)
    }

    async fn update_deal(&self, params: UpdateDealParams) -> Result<DealRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.deals, params.id, |deal| {
            deal.speaker_id = params.speaker_id;
            deal.event_name = params.event_name;
            deal.event_date = params.event_date;
            deal.event_location = params.event_location;
            deal.value_cents = params.value_cents;
            deal.currency = params.currency;
            deal.notes = params.notes;
        })
    }

    async fn set_deal_stage(
        &self,
        id: Uuid,
        stage: DealStage,
        closed_at: Option<OffsetDateTime>,
    ) -> Result<DealRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.deals, id, |deal| {
            deal.stage = stage;
            deal.closed_at = closed_at;
        })
    }

    async fn find_deal(&self, id: Uuid) -> Result<Option<DealRecord>, RepoError> {
        Ok(self.deal(id))
    }

    async fn list_deals(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &DealQueryFilter,
    ) -> Result<CursorPage<DealRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .deals
            .iter()
            .rev()
            .filter(|deal| filter.stage.is_none_or(|stage| deal.stage == stage))
            .filter(|deal| filter.client_id.is_none_or(|id| deal.client_id == id))
            .filter(|deal| filter.speaker_id.is_none_or(|id| deal.speaker_id == Some(id)))
            .filter(|deal| matches_search(&filter.search, &[&deal.event_name]))
            .cloned()
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn list_deals_for_client(&self, client_id: Uuid) -> Result<Vec<DealRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .deals
            .iter()
            .filter(|deal| deal.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn list_engagements_for_speaker(
        &self,
        speaker_id: Uuid,
    ) -> Result<Vec<DealRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .deals
            .iter()
            .filter(|deal| deal.speaker_id == Some(speaker_id))
            .filter(|deal| matches!(deal.stage, DealStage::Negotiation | DealStage::Won))
            .cloned()
            .collect())
    }

    async fn count_contracts_for_deal(&self, id: Uuid) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contracts
            .iter()
            .filter(|contract| contract.deal_id == id)
            .count() as u64)
    }

    async fn delete_deal(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().deals.retain(|deal| deal.id != id);
        Ok(())
    }
}

#[async_trait]
impl ContractsRepo for MemoryStore {
    async fn count_contracts_numbered_in_year(&self, year: i32) -> Result<u64, RepoError> {
        let prefix = format!("CT-{year}-");
        let state = self.state.lock().unwrap();
        Ok(state
            .contracts
            .iter()
            .filter(|contract| contract.number.starts_with(&prefix))
            .count() as u64)
    }

    async fn create_contract(
        &self,
        params: CreateContractParams,
    ) -> Result<ContractRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state
            .contracts
            .iter()
            .any(|contract| contract.number == params.number)
        {
            return Err(RepoError::Duplicate {
                constraint: "contracts_number_key".into(),
            });
        }
        let record = ContractRecord {
            id: Uuid::new_v4(),
            deal_id: params.deal_id,
            number: params.number,
            fee_cents: params.fee_cents,
            currency: params.currency,
            terms: params.terms,
            status: ContractStatus::Draft,
            view_token: params.view_token,
            sent_at: None,
            expires_at: None,
            signed_at: None,
            signer_name: None,
            created_at: now(),
            updated_at: now(),
        };
        state.contracts.push(record.clone());
        Ok(record)
    }

    async fn update_contract_terms(
        &self,
        id: Uuid,
        fee_cents: i64,
        currency: &str,
        terms: &str,
    ) -> Result<Option<ContractRecord>, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(draft_contract(&mut state.contracts, id).map(|contract| {
            contract.fee_cents = fee_cents;
            contract.currency = currency.to_string();
            contract.terms = terms.to_string();
            contract.updated_at = now();
            contract.clone()
        }))
    }

    async fn mark_contract_sent(
        &self,
        id: Uuid,
        sent_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<Option<ContractRecord>, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(draft_contract(&mut state.contracts, id).map(|contract| {
            contract.status = ContractStatus::Sent;
            contract.sent_at = Some(sent_at);
            contract.expires_at = Some(expires_at);
            contract.updated_at = now();
            contract.clone()
        }))
    }

    async fn transition_contract(
        &self,
        id: Uuid,
        expected: ContractStatus,
        status: ContractStatus,
    ) -> Result<Option<ContractRecord>, RepoError> {
        let mut state = self.state.lock().unwrap();
        match state
            .contracts
            .iter_mut()
            .find(|contract| contract.id == id && contract.status == expected)
        {
            Some(contract) => {
                contract.status = status;
                contract.updated_at = now();
                Ok(Some(contract.clone()))
            }
            None => Ok(None),
        }
    }

    async fn sign_contract(
        &self,
        id: Uuid,
        signer_name: &str,
        signed_at: OffsetDateTime,
    ) -> Result<Option<ContractRecord>, RepoError> {
        let mut state = self.state.lock().unwrap();
        match state
            .contracts
            .iter_mut()
            .find(|contract| contract.id == id && contract.status == ContractStatus::Sent)
        {
            Some(contract) => {
                contract.status = ContractStatus::Signed;
                contract.signer_name = Some(signer_name.to_string());
                contract.signed_at = Some(signed_at);
                Ok(Some(contract.clone()))
            }
            None => Ok(None),
        }
    }

    async fn find_contract(&self, id: Uuid) -> Result<Option<ContractRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.contracts.iter().find(|contract| contract.id == id).cloned())
    }

    async fn find_contract_view_by_token(
        &self,
        token: &str,
    ) -> Result<Option<ContractView>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contracts
            .iter()
            .find(|contract| contract.view_token == token)
            .and_then(|contract| Self::contract_view(&state, contract)))
    }

    async fn list_contracts(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ContractQueryFilter,
    ) -> Result<CursorPage<ContractRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .contracts
            .iter()
            .rev()
            .filter(|contract| filter.status.is_none_or(|status| contract.status == status))
            .filter(|contract| filter.deal_id.is_none_or(|id| contract.deal_id == id))
            .cloned()
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn list_visible_contracts_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ContractView>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contracts
            .iter()
            .filter(|contract| contract.status != ContractStatus::Draft)
            .filter_map(|contract| Self::contract_view(&state, contract))
            .filter(|view| {
                state
                    .deals
                    .iter()
                    .any(|deal| deal.id == view.contract.deal_id && deal.client_id == client_id)
            })
            .collect())
    }

    async fn list_overdue_sent_contracts(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ContractRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contracts
            .iter()
            .filter(|contract| contract.status == ContractStatus::Sent)
            .filter(|contract| contract.expires_at.is_some_and(|at| at <= now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TasksRepo for MemoryStore {
    async fn create_task(&self, params: TaskParams) -> Result<TaskRecord, RepoError> {
        let record = TaskRecord {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            status: TaskStatus::Todo,
            priority: params.priority,
            due_on: params.due_on,
            assignee: params.assignee,
            deal_id: params.deal_id,
            client_id: params.client_id,
            completed_at: None,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().tasks.push(record.clone());
        Ok(record)
    }

    async fn update_task(&self, id: Uuid, params: TaskParams) -> Result<TaskRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.tasks, id, |task| {
            task.title = params.title;
            task.description = params.description;
            task.priority = params.priority;
            task.due_on = params.due_on;
            task.assignee = params.assignee;
            task.deal_id = params.deal_id;
            task.client_id = params.client_id;
        })
    }

    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<OffsetDateTime>,
    ) -> Result<TaskRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.tasks, id, |task| {
            task.status = status;
            task.completed_at = completed_at;
        })
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<TaskRecord>, RepoError> {
        Ok(self.task(id))
    }

    async fn list_tasks(
        &self,
        page: PageRequest<DueCursor>,
        filter: &TaskQueryFilter,
    ) -> Result<CursorPage<TaskRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<_> = state
            .tasks
            .iter()
            .filter(|task| filter.status.is_none_or(|status| task.status == status))
            .filter(|task| filter.priority.is_none_or(|priority| task.priority == priority))
            .filter(|task| filter.deal_id.is_none_or(|id| task.deal_id == Some(id)))
            .filter(|task| {
                filter
                    .assignee
                    .as_deref()
                    .is_none_or(|assignee| task.assignee.as_deref() == Some(assignee))
            })
            .filter(|task| {
                filter.overdue_before.is_none_or(|today| {
                    task.status != TaskStatus::Done && task.due_on.is_some_and(|due| due < today)
                })
            })
            .cloned()
            .collect();
        items.sort_by_key(|task| (task.due_on.is_none(), task.due_on, task.created_at));
        Ok(page_of(items, page.limit))
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().tasks.retain(|task| task.id != id);
        Ok(())
    }
}

#[async_trait]
impl SubscribersRepo for MemoryStore {
    async fn find_subscriber_by_email(
        &self,
        email: &str,
    ) -> Result<Option<SubscriberRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscribers
            .iter()
            .find(|subscriber| subscriber.email == email)
            .cloned())
    }

    async fn insert_subscriber(
        &self,
        params: NewSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        let record = SubscriberRecord {
            id: Uuid::new_v4(),
            email: params.email,
            name: params.name,
            status: SubscriberStatus::Active,
            unsubscribe_token: params.unsubscribe_token,
            source: params.source,
            subscribed_at: now(),
            unsubscribed_at: None,
        };
        self.state.lock().unwrap().subscribers.push(record.clone());
        Ok(record)
    }

    async fn reactivate_subscriber(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> Result<SubscriberRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let subscriber = state
            .subscribers
            .iter_mut()
            .find(|subscriber| subscriber.id == id)
            .ok_or(RepoError::NotFound)?;
        subscriber.status = SubscriberStatus::Active;
        if name.is_some() {
            subscriber.name = name;
        }
        subscriber.subscribed_at = now();
        subscriber.unsubscribed_at = None;
        Ok(subscriber.clone())
    }

    async fn unsubscribe_by_token(
        &self,
        token: &str,
        at: OffsetDateTime,
    ) -> Result<Option<SubscriberRecord>, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .subscribers
            .iter_mut()
            .find(|subscriber| subscriber.unsubscribe_token == token)
            .map(|subscriber| {
                subscriber.status = SubscriberStatus::Unsubscribed;
                subscriber.unsubscribed_at.get_or_insert(at);
                subscriber.clone()
            }))
    }

    async fn list_subscribers(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &SubscriberQueryFilter,
    ) -> Result<CursorPage<SubscriberRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .subscribers
            .iter()
            .rev()
            .filter(|subscriber| filter.status.is_none_or(|status| subscriber.status == status))
            .filter(|subscriber| matches_search(&filter.search, &[&subscriber.email]))
            .cloned()
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn count_active_subscribers(&self) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.status == SubscriberStatus::Active)
            .count() as u64)
    }

    async fn delete_subscriber(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        let before = state.subscribers.len();
        state.subscribers.retain(|subscriber| subscriber.id != id);
        if state.subscribers.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CampaignsRepo for MemoryStore {
    async fn create_campaign(&self, params: CampaignParams) -> Result<CampaignRecord, RepoError> {
        let record = CampaignRecord {
            id: Uuid::new_v4(),
            subject: params.subject,
            preheader: params.preheader,
            body_markdown: params.body_markdown,
            status: CampaignStatus::Draft,
            recipient_count: 0,
            rendered_html: None,
            sent_at: None,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().campaigns.push(record.clone());
        Ok(record)
    }

    async fn update_campaign(
        &self,
        id: Uuid,
        params: CampaignParams,
    ) -> Result<CampaignRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.campaigns, id, |campaign| {
            campaign.subject = params.subject;
            campaign.preheader = params.preheader;
            campaign.body_markdown = params.body_markdown;
        })
    }

    async fn find_campaign(&self, id: Uuid) -> Result<Option<CampaignRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.campaigns.iter().find(|campaign| campaign.id == id).cloned())
    }

    async fn list_campaigns(
        &self,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<CampaignRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(page_of(state.campaigns.iter().rev().cloned().collect(), page.limit))
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().campaigns.retain(|campaign| campaign.id != id);
        Ok(())
    }

    async fn mark_campaign_sent(
        &self,
        id: Uuid,
        rendered_html: &str,
        recipient_count: i32,
        sent_at: OffsetDateTime,
    ) -> Result<Option<CampaignRecord>, RepoError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .campaigns
            .iter_mut()
            .find(|campaign| campaign.id == id && campaign.status == CampaignStatus::Draft)
            .map(|campaign| {
                campaign.status = CampaignStatus::Sent;
                campaign.rendered_html = Some(rendered_html.to_string());
                campaign.recipient_count = recipient_count;
                campaign.sent_at = Some(sent_at);
                campaign.clone()
            }))
    }
}

#[async_trait]
impl ArticlesRepo for MemoryStore {
    async fn article_slug_taken(
        &self,
        slug: &str,
        source: &str,
        external_id: &str,
    ) -> Result<bool, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.articles.iter().any(|article| {
            article.slug == slug && !(article.source == source && article.external_id == external_id)
        }))
    }

    async fn upsert_article(
        &self,
        params: UpsertArticleParams,
    ) -> Result<(ArticleRecord, UpsertOutcome), RepoError> {
        let mut state = self.state.lock().unwrap();
        if let Some(article) = state.articles.iter_mut().find(|article| {
            article.source == params.source && article.external_id == params.external_id
        }) {
            article.slug = params.slug;
            article.title = params.title;
            article.meta_description = params.meta_description;
            article.image_url = params.image_url;
            article.tags = params.tags;
            article.body_markdown = params.body_markdown;
            article.body_json = params.body_json;
            article.body_html = params.body_html;
            article.word_count = params.word_count;
            article.reading_minutes = params.reading_minutes;
            article.published_at = params.published_at;
            article.updated_at = now();
            return Ok((article.clone(), UpsertOutcome::Updated));
        }

        let record = ArticleRecord {
            id: Uuid::new_v4(),
            source: params.source,
            external_id: params.external_id,
            slug: params.slug,
            title: params.title,
            meta_description: params.meta_description,
            image_url: params.image_url,
            tags: params.tags,
            body_markdown: params.body_markdown,
            body_json: params.body_json,
            body_html: params.body_html,
            word_count: params.word_count,
            reading_minutes: params.reading_minutes,
            status: ArticleStatus::Published,
            published_at: params.published_at,
            created_at: now(),
            updated_at: now(),
        };
        state.articles.push(record.clone());
        Ok((record, UpsertOutcome::Created))
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.articles.iter().find(|article| article.id == id).cloned())
    }

    async fn find_published_article_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .articles
            .iter()
            .find(|article| article.slug == slug && article.status == ArticleStatus::Published)
            .cloned())
    }

    async fn list_articles(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ArticleQueryFilter,
    ) -> Result<CursorPage<ArticleSummary>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .articles
            .iter()
            .rev()
            .filter(|article| filter.status.is_none_or(|status| article.status == status))
            .filter(|article| matches_search(&filter.search, &[&article.title]))
            .map(|article| ArticleSummary {
                id: article.id,
                slug: article.slug.clone(),
                title: article.title.clone(),
                meta_description: article.meta_description.clone(),
                image_url: article.image_url.clone(),
                tags: article.tags.clone(),
                reading_minutes: article.reading_minutes,
                status: article.status,
                published_at: article.published_at,
            })
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn set_article_status(
        &self,
        id: Uuid,
        status: ArticleStatus,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.articles, id, |article| {
            article.status = status;
        })
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().articles.retain(|article| article.id != id);
        Ok(())
    }
}

#[async_trait]
impl ConferencesRepo for MemoryStore {
    async fn create_conference(
        &self,
        slug: &str,
        params: ConferenceParams,
    ) -> Result<ConferenceRecord, RepoError> {
        let record = ConferenceRecord {
            id: Uuid::new_v4(),
            name: params.name,
            slug: slug.to_string(),
            description: params.description,
            category: params.category,
            city: params.city,
            country: params.country,
            starts_on: params.starts_on,
            ends_on: params.ends_on,
            website_url: params.website_url,
            cfp_deadline: params.cfp_deadline,
            published: params.published,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().conferences.push(record.clone());
        Ok(record)
    }

    async fn update_conference(
        &self,
        id: Uuid,
        params: ConferenceParams,
    ) -> Result<ConferenceRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.conferences, id, |conference| {
            conference.name = params.name;
            conference.description = params.description;
            conference.category = params.category;
            conference.city = params.city;
            conference.country = params.country;
            conference.starts_on = params.starts_on;
            conference.ends_on = params.ends_on;
            conference.website_url = params.website_url;
            conference.cfp_deadline = params.cfp_deadline;
            conference.published = params.published;
        })
    }

    async fn find_conference(&self, id: Uuid) -> Result<Option<ConferenceRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.conferences.iter().find(|conference| conference.id == id).cloned())
    }

    async fn find_published_conference_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ConferenceRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .conferences
            .iter()
            .find(|conference| conference.slug == slug && conference.published)
            .cloned())
    }

    async fn conference_slug_taken(&self, slug: &str) -> Result<bool, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.conferences.iter().any(|conference| conference.slug == slug))
    }

    async fn list_conferences(
        &self,
        page: PageRequest<DateCursor>,
        filter: &ConferenceQueryFilter,
    ) -> Result<CursorPage<ConferenceRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<_> = state
            .conferences
            .iter()
            .filter(|conference| !filter.published_only || conference.published)
            .filter(|conference| filter.ending_from.is_none_or(|from| conference.ends_on >= from))
            .filter(|conference| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|category| conference.category.eq_ignore_ascii_case(category))
            })
            .filter(|conference| {
                filter
                    .country
                    .as_deref()
                    .is_none_or(|country| conference.country.eq_ignore_ascii_case(country))
            })
            .filter(|conference| matches_search(&filter.search, &[&conference.name, &conference.city]))
            .cloned()
            .collect();
        items.sort_by_key(|conference| (conference.starts_on, conference.id));
        Ok(page_of(items, page.limit))
    }

    async fn conference_categories(
        &self,
        ending_from: Option<Date>,
    ) -> Result<Vec<CategoryCount>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut counts: Vec<CategoryCount> = Vec::new();
        for conference in state
            .conferences
            .iter()
            .filter(|conference| conference.published)
            .filter(|conference| ending_from.is_none_or(|from| conference.ends_on >= from))
        {
            match counts
                .iter_mut()
                .find(|entry| entry.category == conference.category)
            {
                Some(entry) => entry.count += 1,
                None => counts.push(CategoryCount {
                    category: conference.category.clone(),
                    count: 1,
                }),
            }
        }
        counts.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(counts)
    }

    async fn delete_conference(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().conferences.retain(|conference| conference.id != id);
        Ok(())
    }
}

#[async_trait]
impl WorkshopsRepo for MemoryStore {
    async fn create_workshop(
        &self,
        slug: &str,
        params: WorkshopParams,
    ) -> Result<WorkshopRecord, RepoError> {
        let record = WorkshopRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: slug.to_string(),
            speaker_id: params.speaker_id,
            summary: params.summary,
            format: params.format,
            duration_minutes: params.duration_minutes,
            price_cents: params.price_cents,
            published: params.published,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().workshops.push(record.clone());
        Ok(record)
    }

    async fn update_workshop(
        &self,
        id: Uuid,
        params: WorkshopParams,
    ) -> Result<WorkshopRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.workshops, id, |workshop| {
            workshop.title = params.title;
            workshop.speaker_id = params.speaker_id;
            workshop.summary = params.summary;
            workshop.format = params.format;
            workshop.duration_minutes = params.duration_minutes;
            workshop.price_cents = params.price_cents;
            workshop.published = params.published;
        })
    }

    async fn find_workshop(&self, id: Uuid) -> Result<Option<WorkshopRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.workshops.iter().find(|workshop| workshop.id == id).cloned())
    }

    async fn find_published_workshop_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<WorkshopListing>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .workshops
            .iter()
            .find(|workshop| workshop.slug == slug && workshop.published)
            .and_then(|workshop| Self::listing(&state, workshop)))
    }

    async fn workshop_slug_taken(&self, slug: &str) -> Result<bool, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.workshops.iter().any(|workshop| workshop.slug == slug))
    }

    async fn list_workshops(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &WorkshopQueryFilter,
    ) -> Result<CursorPage<WorkshopListing>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .workshops
            .iter()
            .rev()
            .filter(|workshop| !filter.published_only || workshop.published)
            .filter(|workshop| filter.format.is_none_or(|format| workshop.format == format))
            .filter(|workshop| matches_search(&filter.search, &[&workshop.title, &workshop.summary]))
            .filter_map(|workshop| Self::listing(&state, workshop))
            .filter(|listing| {
                filter
                    .speaker_slug
                    .as_deref()
                    .is_none_or(|slug| listing.speaker_slug == slug)
            })
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn list_published_workshops_for_speaker(
        &self,
        speaker_id: Uuid,
    ) -> Result<Vec<WorkshopRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .workshops
            .iter()
            .filter(|workshop| workshop.speaker_id == speaker_id && workshop.published)
            .cloned()
            .collect())
    }

    async fn delete_workshop(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().workshops.retain(|workshop| workshop.id != id);
        Ok(())
    }
}

#[async_trait]
impl VendorsRepo for MemoryStore {
    async fn create_vendor(&self, params: VendorParams) -> Result<VendorRecord, RepoError> {
        let record = VendorRecord {
            id: Uuid::new_v4(),
            name: params.name,
            category: params.category,
            contact_name: params.contact_name,
            email: params.email,
            phone: params.phone,
            website: params.website,
            rating: params.rating,
            notes: params.notes,
            active: params.active,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().unwrap().vendors.push(record.clone());
        Ok(record)
    }

    async fn update_vendor(
        &self,
        id: Uuid,
        params: VendorParams,
    ) -> Result<VendorRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        update_in!(state.vendors, id, |vendor| {
            vendor.name = params.name;
            vendor.category = params.category;
            vendor.contact_name = params.contact_name;
            vendor.email = params.email;
            vendor.phone = params.phone;
            vendor.website = params.website;
            vendor.rating = params.rating;
            vendor.notes = params.notes;
            vendor.active = params.active;
        })
    }

    async fn find_vendor(&self, id: Uuid) -> Result<Option<VendorRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.vendors.iter().find(|vendor| vendor.id == id).cloned())
    }

    async fn list_vendors(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &VendorQueryFilter,
    ) -> Result<CursorPage<VendorRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let items = state
            .vendors
            .iter()
            .rev()
            .filter(|vendor| filter.category.is_none_or(|category| vendor.category == category))
            .filter(|vendor| filter.active.is_none_or(|active| vendor.active == active))
            .filter(|vendor| matches_search(&filter.search, &[&vendor.name]))
            .cloned()
            .collect();
        Ok(page_of(items, page.limit))
    }

    async fn delete_vendor(&self, id: Uuid) -> Result<(), RepoError> {
        self.state.lock().unwrap().vendors.retain(|vendor| vendor.id != id);
        Ok(())
    }
}

#[async_trait]
impl AnalyticsRepo for MemoryStore {
    async fn deal_stage_totals(&self) -> Result<Vec<StageTotal>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(DealStage::ALL
            .iter()
            .filter_map(|stage| {
                let deals: Vec<_> = state.deals.iter().filter(|deal| deal.stage == *stage).collect();
                (!deals.is_empty()).then(|| StageTotal {
                    stage: *stage,
                    count: deals.len() as u64,
                    value_cents: deals.iter().map(|deal| deal.value_cents).sum(),
                })
            })
            .collect())
    }

    async fn closed_deal_totals(
        &self,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<ClosedDealTotals, RepoError> {
        let state = self.state.lock().unwrap();
        let mut totals = ClosedDealTotals::default();
        for deal in state
            .deals
            .iter()
            .filter(|deal| deal.closed_at.is_some_and(|at| at >= from && at < until))
        {
            match deal.stage {
                DealStage::Won => {
                    totals.won_count += 1;
                    totals.won_cents += deal.value_cents;
                }
                DealStage::Lost => totals.lost_count += 1,
                _ => {}
            }
        }
        Ok(totals)
    }

    async fn task_status_counts(&self) -> Result<Vec<(TaskStatus, u64)>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(TaskStatus::ALL
            .iter()
            .map(|status| {
                let count = state.tasks.iter().filter(|task| task.status == *status).count();
                (*status, count as u64)
            })
            .collect())
    }

    async fn overdue_task_count(&self, today: Date) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Done)
            .filter(|task| task.due_on.is_some_and(|due| due < today))
            .count() as u64)
    }

    async fn contract_status_counts(&self) -> Result<Vec<(ContractStatus, u64)>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(ContractStatus::ALL
            .iter()
            .map(|status| {
                let count = state
                    .contracts
                    .iter()
                    .filter(|contract| contract.status == *status)
                    .count();
                (*status, count as u64)
            })
            .collect())
    }

    async fn subscriber_totals(
        &self,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<SubscriberTotals, RepoError> {
        let state = self.state.lock().unwrap();
        let mut totals = SubscriberTotals::default();
        for subscriber in &state.subscribers {
            match subscriber.status {
                SubscriberStatus::Active => totals.active += 1,
                SubscriberStatus::Unsubscribed => totals.unsubscribed += 1,
            }
            if subscriber.subscribed_at >= from && subscriber.subscribed_at < until {
                totals.new_in_range += 1;
            }
        }
        Ok(totals)
    }
}
