use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, TimeCursor},
    application::repos::{
        CreateDealParams, DealQueryFilter, DealsRepo, RepoError, UpdateDealParams,
    },
    domain::entities::DealRecord,
    domain::types::DealStage,
};

use super::{PostgresRepositories, map_sqlx_error};

const DEAL_COLUMNS: &str = "id, client_id, speaker_id, event_name, event_date, event_location, \
     value_cents, currency, stage, notes, closed_at, created_at, updated_at";

#[async_trait]
impl DealsRepo for PostgresRepositories {
    async fn create_deal(&self, params: CreateDealParams) -> Result<DealRecord, RepoError> {
        sqlx::query_as::<_, DealRecord>(&format!(
            "INSERT INTO deals (client_id, speaker_id, event_name, event_date, event_location, \
             value_cents, currency, stage, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {DEAL_COLUMNS}"
        ))
        .bind(params.client_id)
        .bind(params.speaker_id)
        .bind(params.event_name)
        .bind(params.event_date)
        .bind(params.event_location)
        .bind(params.value_cents)
        .bind(params.currency)
        .bind(params.stage)
        .bind(params.notes)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_deal(&self, params: UpdateDealParams) -> Result<DealRecord, RepoError> {
        sqlx::query_as::<_, DealRecord>(&format!(
            "UPDATE deals SET speaker_id = $2, event_name = $3, event_date = $4, \
             event_location = $5, value_cents = $6, currency = $7, notes = $8, \
             updated_at = now() WHERE id = $1 RETURNING {DEAL_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.speaker_id)
        .bind(params.event_name)
        .bind(params.event_date)
        .bind(params.event_location)
        .bind(params.value_cents)
        .bind(params.currency)
        .bind(params.notes)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_deal_stage(
        &self,
        id: Uuid,
        stage: DealStage,
        closed_at: Option<OffsetDateTime>,
    ) -> Result<DealRecord, RepoError> {
        sqlx::query_as::<_, DealRecord>(&format!(
            "UPDATE deals SET stage = $2, closed_at = $3, updated_at = now() \
             WHERE id = $1 RETURNING {DEAL_COLUMNS}"
        ))
        .bind(id)
        .bind(stage)
        .bind(closed_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_deal(&self, id: Uuid) -> Result<Option<DealRecord>, RepoError> {
        sqlx::query_as::<_, DealRecord>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_deals(
        &self,
        page: PageRequest<TimeCursor>,
        filter: &DealQueryFilter,
    ) -> Result<CursorPage<DealRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {DEAL_COLUMNS} FROM deals WHERE 1=1 "));
        if let Some(stage) = filter.stage {
            qb.push(" AND stage = ");
            qb.push_bind(stage);
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND client_id = ");
            qb.push_bind(client_id);
        }
        if let Some(speaker_id) = filter.speaker_id {
            qb.push(" AND speaker_id = ");
            qb.push_bind(speaker_id);
        }
        if let Some(search) = filter.search.as_ref() {
            Self::push_search(&mut qb, &["event_name", "event_location", "notes"], search);
        }
        if let Some(cursor) = page.cursor.as_ref() {
            Self::push_keyset(&mut qb, "created_at, id", "<", cursor);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<DealRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::finish_page(rows, &page, |deal| {
            TimeCursor::new(deal.created_at, deal.id).encode()
        }))
    }

    async fn list_deals_for_client(&self, client_id: Uuid) -> Result<Vec<DealRecord>, RepoError> {
        sqlx::query_as::<_, DealRecord>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals WHERE client_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(client_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_engagements_for_speaker(
        &self,
        speaker_id: Uuid,
    ) -> Result<Vec<DealRecord>, RepoError> {
        sqlx::query_as::<_, DealRecord>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals WHERE speaker_id = $1 \
             AND stage IN ('negotiation', 'won') \
             ORDER BY event_date ASC NULLS LAST, created_at DESC"
        ))
        .bind(speaker_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_contracts_for_deal(&self, id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contracts WHERE deal_id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn delete_deal(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
