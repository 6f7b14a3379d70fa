use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::application::admin::audit::ActivityService;
use crate::application::pagination::{CursorPage, PageRequest, TimeCursor};
use crate::application::repos::{
    ContractQueryFilter, ContractsRepo, CreateContractParams, DealsRepo, RepoError,
};
use crate::application::tokens::issue_token;
use crate::domain::contracts::{
    contract_number, ensure_signable, expiry_for, validate_status_change,
};
use crate::domain::deals::validate_currency;
use crate::domain::entities::{ContractRecord, ContractView};
use crate::domain::error::DomainError;
use crate::domain::rich_text::RichDocument;
use crate::domain::types::{ContractStatus, DealStage};
use crate::domain::validate;
use lectern_api_types::{ContractCreateRequest, ContractSendRequest, ContractUpdateRequest};

const NUMBERING_ATTEMPTS: usize = 3;
const VIEWER_ACTOR: &str = "contract_viewer";
const EXPIRY_ACTOR: &str = "system:expire_contracts";

#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Public viewer payload: the contract with its terms rendered to HTML.
#[derive(Debug, Clone, Serialize)]
pub struct ContractViewerPage {
    #[serde(flatten)]
    pub view: ContractView,
    pub terms_html: String,
}

/// Absolute viewer link handed to clients.
pub fn viewer_url(base: &Url, token: &str) -> String {
    let mut url = base.clone();
    url.set_path(&format!(
        "{}/contracts/view/{token}",
        base.path().trim_end_matches('/')
    ));
    url.to_string()
}

#[derive(Clone)]
pub struct ContractService {
    contracts: Arc<dyn ContractsRepo>,
    deals: Arc<dyn DealsRepo>,
    audit: ActivityService,
}

impl ContractService {
    pub fn new(
        contracts: Arc<dyn ContractsRepo>,
        deals: Arc<dyn DealsRepo>,
        audit: ActivityService,
    ) -> Self {
        Self {
            contracts,
            deals,
            audit,
        }
    }

    pub async fn list(
        &self,
        filter: &ContractQueryFilter,
        page: PageRequest<TimeCursor>,
    ) -> Result<CursorPage<ContractRecord>, ContractError> {
        Ok(self.contracts.list_contracts(page, filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<ContractRecord, ContractError> {
        self.contracts
            .find_contract(id)
            .await?
            .ok_or_else(|| DomainError::not_found("contract").into())
    }

    pub async fn create(
        &self,
        actor: &str,
        request: ContractCreateRequest,
    ) -> Result<ContractRecord, ContractError> {
        let deal = self
            .deals
            .find_deal(request.deal_id)
            .await?
            .ok_or(DomainError::not_found("deal"))?;
        if deal.speaker_id.is_none() {
            return Err(DomainError::invariant("deal has no speaker assigned").into());
        }
        if deal.stage == DealStage::Lost {
            return Err(DomainError::invariant("cannot contract a lost deal").into());
        }

        let fee_cents = validate::non_negative(
            "fee_cents",
            request.fee_cents.unwrap_or(deal.value_cents),
        )?;
        let currency = validate_currency(request.currency.as_deref().unwrap_or(&deal.currency))?;
        let terms = request.terms.trim().to_string();
        let year = OffsetDateTime::now_utc().year();

        let mut attempt = 0;
        let contract = loop {
            attempt += 1;
            let existing = self.contracts.count_contracts_numbered_in_year(year).await?;
            let params = CreateContractParams {
                deal_id: deal.id,
                number: contract_number(year, existing),
                fee_cents,
                currency: currency.clone(),
                terms: terms.clone(),
                view_token: issue_token(),
            };
            match self.contracts.create_contract(params).await {
                Ok(contract) => break contract,
                Err(RepoError::Duplicate { constraint }) if attempt < NUMBERING_ATTEMPTS => {
                    warn!(
                        target = "lectern::contracts",
                        constraint = %constraint,
                        attempt,
                        "contract number collided, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        };

        self.log(actor, "contract.create", &contract).await?;
        Ok(contract)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        request: ContractUpdateRequest,
    ) -> Result<ContractRecord, ContractError> {
        let contract = self.get(id).await?;
        if contract.status != ContractStatus::Draft {
            return Err(DomainError::invariant("only draft contracts can be edited").into());
        }

        let fee_cents = validate::non_negative("fee_cents", request.fee_cents)?;
        let currency = validate_currency(&request.currency)?;
        let updated = self
            .contracts
            .update_contract_terms(id, fee_cents, &currency, request.terms.trim())
            .await?
            .ok_or_else(|| DomainError::invariant("only draft contracts can be edited"))?;
        self.log(actor, "contract.update", &updated).await?;
        Ok(updated)
    }

    pub async fn send(
        &self,
        actor: &str,
        id: Uuid,
        request: ContractSendRequest,
    ) -> Result<ContractRecord, ContractError> {
        let contract = self.get(id).await?;
        validate_status_change(contract.status, ContractStatus::Sent)?;

        let sent_at = OffsetDateTime::now_utc();
        let expires_at = expiry_for(sent_at, request.validity_days)?;
        let sent = self
            .contracts
            .mark_contract_sent(id, sent_at, expires_at)
            .await?
            .ok_or_else(|| {
                DomainError::transition(
                    "contract",
                    contract.status.as_str(),
                    ContractStatus::Sent.as_str(),
                )
            })?;
        self.log(actor, "contract.send", &sent).await?;
        Ok(sent)
    }

    pub async fn cancel(&self, actor: &str, id: Uuid) -> Result<ContractRecord, ContractError> {
        let contract = self.get(id).await?;
        let cancelled = self
            .transition(&contract, ContractStatus::Cancelled)
            .await?;
        self.log(actor, "contract.cancel", &cancelled).await?;
        Ok(cancelled)
    }

    /// Drafts are never exposed through the viewer.
    pub async fn view_by_token(&self, token: &str) -> Result<ContractViewerPage, ContractError> {
        let view = self.visible_view(token).await?;
        let terms_html = RichDocument::from_markdown(&view.contract.terms).render_html();
        Ok(ContractViewerPage { view, terms_html })
    }

    pub async fn sign_by_token(
        &self,
        token: &str,
        signer_name: &str,
    ) -> Result<ContractRecord, ContractError> {
        let signer_name = validate::required("signer_name", signer_name)?;
        let view = self.visible_view(token).await?;
        let contract = view.contract;
        let now = OffsetDateTime::now_utc();
        ensure_signable(contract.status, contract.expires_at, now)?;

        let signed = self
            .contracts
            .sign_contract(contract.id, &signer_name, now)
            .await?
            .ok_or_else(|| {
                DomainError::transition(
                    "contract",
                    contract.status.as_str(),
                    ContractStatus::Signed.as_str(),
                )
            })?;
        self.audit
            .record(
                VIEWER_ACTOR,
                "contract.sign",
                "contract",
                Some(&signed.id.to_string()),
                Some(&SignSnapshot {
                    number: &signed.number,
                    signer_name: &signer_name,
                }),
            )
            .await?;

        if let Some(deal) = self.deals.find_deal(signed.deal_id).await?
            && deal.stage.is_open()
        {
            self.deals
                .set_deal_stage(deal.id, DealStage::Won, Some(now))
                .await?;
            self.audit
                .record(
                    VIEWER_ACTOR,
                    "deal.stage",
                    "deal",
                    Some(&deal.id.to_string()),
                    Some(&serde_json::json!({ "from": deal.stage, "to": DealStage::Won })),
                )
                .await?;
        }

        Ok(signed)
    }

    /// Move every lapsed `sent` contract to `expired`; returns how many moved.
    pub async fn expire_overdue(&self, now: OffsetDateTime) -> Result<usize, ContractError> {
        let overdue = self.contracts.list_overdue_sent_contracts(now).await?;
        let mut expired = 0;
        for contract in overdue {
            match self
                .contracts
                .transition_contract(contract.id, ContractStatus::Sent, ContractStatus::Expired)
                .await?
            {
                Some(updated) => {
                    expired += 1;
                    self.log(EXPIRY_ACTOR, "contract.expire", &updated).await?;
                }
                None => info!(
                    target = "lectern::jobs::contracts",
                    contract = %contract.id,
                    "contract changed before it could expire"
                ),
            }
        }
        Ok(expired)
    }

    async fn visible_view(&self, token: &str) -> Result<ContractView, ContractError> {
        match self.contracts.find_contract_view_by_token(token).await? {
            Some(view) if view.contract.status != ContractStatus::Draft => Ok(view),
            _ => Err(DomainError::not_found("contract").into()),
        }
    }

    async fn transition(
        &self,
        contract: &ContractRecord,
        to: ContractStatus,
    ) -> Result<ContractRecord, ContractError> {
        validate_status_change(contract.status, to)?;
        self.contracts
            .transition_contract(contract.id, contract.status, to)
            .await?
            .ok_or_else(|| {
                DomainError::transition("contract", contract.status.as_str(), to.as_str()).into()
            })
    }

    async fn log(
        &self,
        actor: &str,
        action: &str,
        contract: &ContractRecord,
    ) -> Result<(), ContractError> {
        let snapshot = ContractSnapshot {
            number: &contract.number,
            status: contract.status,
            fee_cents: contract.fee_cents,
        };
        self.audit
            .record(
                actor,
                action,
                "contract",
                Some(&contract.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ContractSnapshot<'a> {
    number: &'a str,
    status: ContractStatus,
    fee_cents: i64,
}

#[derive(Debug, Serialize)]
struct SignSnapshot<'a> {
    number: &'a str,
    signer_name: &'a str,
}
