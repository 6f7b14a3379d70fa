use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{
        ContractQueryFilter, ContractsRepo, CreateContractParams, RepoError,
    },
    domain::entities::{ContractRecord, ContractView},
    domain::types::ContractStatus,
};

use super::{PostgresRepositories, map_sqlx_error};

const CONTRACT_COLUMNS: &str = "id, deal_id, number, fee_cents, currency, terms, status, \
     view_token, sent_at, expires_at, signed_at, signer_name, created_at, updated_at";

const CONTRACT_VIEW_SELECT: &str = "SELECT c.id, c.deal_id, c.number, c.fee_cents, c.currency, \
     c.terms, c.status, c.view_token, c.sent_at, c.expires_at, c.signed_at, c.signer_name, \
     c.created_at, c.updated_at, cl.name AS client_name, s.name AS speaker_name, \
     d.event_name, d.event_date, d.event_location \
     FROM contracts c \
     JOIN deals d ON d.id = c.deal_id \
     JOIN clients cl ON cl.id = d.client_id \
     LEFT JOIN speakers s ON s.id = d.speaker_id";

#[async_trait]
impl ContractsRepo for PostgresRepositories {
    async fn count_contracts_numbered_in_year(&self, year: i32) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contracts WHERE number LIKE $1")
            .bind(format!("CT-{year}-%"))
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn create_contract(
        &self,
        params: CreateContractParams,
    ) -> Result<ContractRecord, RepoError> {
        sqlx::query_as::<_, ContractRecord>(&format!(
            "INSERT INTO contracts (deal_id, number, fee_cents, currency, terms, view_token) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(params.deal_id)
        .bind(params.number)
        .bind(params.fee_cents)
        .bind(params.currency)
        .bind(params.terms)
        .bind(params.view_token)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_contract_terms(
        &self,
        id: Uuid,
        fee_cents: i64,
        currency: &str,
        terms: &str,
    ) -> Result<Option<ContractRecord>, RepoError> {
        sqlx::query_as::<_, ContractRecord>(&format!(
            "UPDATE contracts SET fee_cents = $2, currency = $3, terms = $4, updated_at = now() \
             WHERE id = $1 AND status = 'draft' RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(id)
        .bind(fee_cents)
        .bind(currency)
        .bind(terms)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn mark_contract_sent(
        &self,
        id: Uuid,
        sent_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<Option<ContractRecord>, RepoError> {
        sqlx::query_as::<_, ContractRecord>(&format!(
            "UPDATE contracts SET status = 'sent', sent_at = $2, expires_at = $3, \
             updated_at = now() WHERE id = $1 AND status = 'draft' RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(id)
        .bind(sent_at)
        .bind(expires_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn transition_contract(
        &self,
        id: Uuid,
        expected: ContractStatus,
        status: ContractStatus,
    ) -> Result<Option<ContractRecord>, RepoError> {
        sqlx::query_as::<_, ContractRecord>(&format!(
            "UPDATE contracts SET status = $3, updated_at = now() \
             WHERE id = $1 AND status = $2 RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(id)
        .bind(expected)
        .bind(status)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn sign_contract(
        &self,
        id: Uuid,
        signer_name: &str,
        signed_at: OffsetDateTime,
    ) -> Result<Option<ContractRecord>, RepoError> {
        sqlx::query_as::<_, ContractRecord>(&format!(
            "UPDATE contracts SET status = 'signed', signer_name = $2, signed_at = $3, \
             updated_at = now() WHERE id = $1 AND status = 'sent' RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(id)
        .bind(signer_name)
        .bind(signed_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_contract(&self, id: Uuid) -> Result<Option<ContractRecord>, RepoError> {
        sqlx::query_as::<_, ContractRecord>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_contract_view_by_token(
        &self,
        token: &str,
    ) -> Result<Option<ContractView>, RepoError> {
        sqlx::query_as::<_, ContractView>(&format!(
            "{CONTRACT_VIEW_SELECT} WHERE c.view_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_contracts(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &ContractQueryFilter,
    ) -> Result<CursorPage<ContractRecord>, RepoError> {
        let mut qb =
            QueryBuilder::new(format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE 1=1 "));
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(deal_id) = filter.deal_id {
            qb.push(" AND deal_id = ");
            qb.push_bind(deal_id);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "created_at, id", "<", cursor);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<ContractRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |contract| {
            TimeCursor::new(contract.created_at, contract.id).encode()
        }))
    }

    async fn list_visible_contracts_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ContractView>, RepoError> {
        sqlx::query_as::<_, ContractView>(&format!(
            "{CONTRACT_VIEW_SELECT} WHERE d.client_id = $1 AND c.status <> 'draft' \
             ORDER BY c.created_at DESC, c.id DESC"
        ))
        .bind(client_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_overdue_sent_contracts(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ContractRecord>, RepoError> {
        sqlx::query_as::<_, ContractRecord>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts \
             WHERE status = 'sent' AND expires_at IS NOT NULL AND expires_at <= $1 \
             ORDER BY expires_at, id"
        ))
        .bind(now)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
