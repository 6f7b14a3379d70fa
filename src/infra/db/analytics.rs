use async_trait::async_trait;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::{
    application::repos::{
        AnalyticsRepo, ClosedDealTotals, RepoError, StageTotal, SubscriberTotals,
    },
    domain::types::{ContractStatus, DealStage, TaskStatus},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(FromRow)]
struct StageRow {
    stage: DealStage,
    count: i64,
    value_cents: i64,
}

#[derive(FromRow)]
struct ClosedRow {
    won_count: i64,
    won_cents: i64,
    lost_count: i64,
}

#[derive(FromRow)]
struct SubscriberRow {
    active: i64,
    unsubscribed: i64,
    new_in_range: i64,
}

impl PostgresRepositories {
    async fn status_counts<S>(&self, table: &str) -> Result<Vec<(S, u64)>, RepoError>
    where
        S: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + Unpin,
    {
        let rows: Vec<(S, i64)> = sqlx::query_as(&format!(
            "SELECT status, COUNT(*) FROM {table} GROUP BY status"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(status, count)| Ok((status, Self::convert_count(count)?)))
            .collect()
    }
}

#[async_trait]
impl AnalyticsRepo for PostgresRepositories {
    async fn deal_stage_totals(&self) -> Result<Vec<StageTotal>, RepoError> {
        let rows = sqlx::query_as::<_, StageRow>(
            "SELECT stage, COUNT(*) AS count, COALESCE(SUM(value_cents), 0)::BIGINT AS value_cents \
             FROM deals GROUP BY stage",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(StageTotal {
                    stage: row.stage,
                    count: Self::convert_count(row.count)?,
                    value_cents: row.value_cents,
                })
            })
            .collect()
    }

    async fn closed_deal_totals(
        &self,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<ClosedDealTotals, RepoError> {
        let row = sqlx::query_as::<_, ClosedRow>(
            "SELECT \
             COUNT(*) FILTER (WHERE stage = 'won') AS won_count, \
             COALESCE(SUM(value_cents) FILTER (WHERE stage = 'won'), 0)::BIGINT AS won_cents, \
             COUNT(*) FILTER (WHERE stage = 'lost') AS lost_count \
             FROM deals WHERE closed_at >= $1 AND closed_at < $2",
        )
        .bind(from)
        .bind(until)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ClosedDealTotals {
            won_count: Self::convert_count(row.won_count)?,
            won_cents: row.won_cents,
            lost_count: Self::convert_count(row.lost_count)?,
        })
    }

    async fn task_status_counts(&self) -> Result<Vec<(TaskStatus, u64)>, RepoError> {
        self.status_counts("tasks").await
    }

    async fn overdue_task_count(&self, today: Date) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE status <> 'done' AND due_on < $1",
        )
        .bind(today)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn contract_status_counts(&self) -> Result<Vec<(ContractStatus, u64)>, RepoError> {
        self.status_counts("contracts").await
    }

    async fn subscriber_totals(
        &self,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<SubscriberTotals, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "SELECT \
             COUNT(*) FILTER (WHERE status = 'active') AS active, \
             COUNT(*) FILTER (WHERE status = 'unsubscribed') AS unsubscribed, \
             COUNT(*) FILTER (WHERE subscribed_at >= $1 AND subscribed_at < $2) AS new_in_range \
             FROM subscribers",
        )
        .bind(from)
        .bind(until)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubscriberTotals {
            active: Self::convert_count(row.active)?,
            unsubscribed: Self::convert_count(row.unsubscribed)?,
            new_in_range: Self::convert_count(row.new_in_range)?,
        })
    }
}
