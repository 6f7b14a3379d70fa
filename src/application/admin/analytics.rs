use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use crate::application::admin::audit::ActivityService;
use crate::application::repos::{AnalyticsRepo, RepoError, StageTotal, SubscriberTotals};
use crate::domain::entities::ActivityRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{ContractStatus, DealStage, TaskStatus};

pub const DEFAULT_RANGE_DAYS: i64 = 90;
const RECENT_ACTIVITY: u32 = 10;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

impl DateRange {
    /// Both ends inclusive; a missing `to` means today and a missing `from`
    /// reaches back [`DEFAULT_RANGE_DAYS`].
    pub fn resolve(from: Option<Date>, to: Option<Date>, today: Date) -> Result<Self, DomainError> {
        let to = to.unwrap_or(today);
        let from = from.unwrap_or_else(|| {
            to.checked_sub(Duration::days(DEFAULT_RANGE_DAYS))
                .unwrap_or(Date::MIN)
        });
        if from > to {
            return Err(DomainError::validation("`from` must not be after `to`"));
        }
        Ok(Self { from, to })
    }

    fn start(&self) -> OffsetDateTime {
        self.from.with_time(Time::MIDNIGHT).assume_utc()
    }

    /// Exclusive upper bound: midnight after `to`, saturating on the last
    /// representable day.
    fn end(&self) -> OffsetDateTime {
        self.to
            .next_day()
            .map_or(PrimitiveDateTime::MAX, |day| day.with_time(Time::MIDNIGHT))
            .assume_utc()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DealSummary {
    pub stages: Vec<StageTotal>,
    pub open_pipeline_cents: i64,
    pub won_cents: i64,
    pub won_count: u64,
    pub lost_count: u64,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount<S> {
    pub status: S,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub statuses: Vec<StatusCount<TaskStatus>>,
    pub overdue: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub range: DateRange,
    pub deals: DealSummary,
    pub tasks: TaskSummary,
    pub contracts: Vec<StatusCount<ContractStatus>>,
    pub newsletter: SubscriberTotals,
    pub recent_activity: Vec<ActivityRecord>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepo>,
    audit: ActivityService,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepo>, audit: ActivityService) -> Self {
        Self { repo, audit }
    }

    pub async fn summary(
        &self,
        range: DateRange,
        today: Date,
    ) -> Result<AnalyticsSummary, AnalyticsError> {
        let (start, end) = (range.start(), range.end());

        let stages = complete_stages(self.repo.deal_stage_totals().await?);
        let open_pipeline_cents = stages
            .iter()
            .filter(|total| total.stage.is_open())
            .map(|total| total.value_cents)
            .sum();
        let closed = self.repo.closed_deal_totals(start, end).await?;
        let decided = closed.won_count + closed.lost_count;
        let win_rate = (decided > 0).then(|| closed.won_count as f64 / decided as f64);

        let task_counts = self.repo.task_status_counts().await?;
        let statuses = TaskStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: lookup(&task_counts, status),
            })
            .collect();
        let overdue = self.repo.overdue_task_count(today).await?;

        let contract_counts = self.repo.contract_status_counts().await?;
        let contracts = ContractStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: lookup(&contract_counts, status),
            })
            .collect();

        let newsletter = self.repo.subscriber_totals(start, end).await?;
        let recent_activity = self.audit.list_recent(RECENT_ACTIVITY).await?;

        Ok(AnalyticsSummary {
            range,
            deals: DealSummary {
                stages,
                open_pipeline_cents,
                won_cents: closed.won_cents,
                won_count: closed.won_count,
                lost_count: closed.lost_count,
                win_rate,
            },
            tasks: TaskSummary { statuses, overdue },
            contracts,
            newsletter,
            recent_activity,
        })
    }
}

/// Every stage appears once, in pipeline order, even with no deals.
fn complete_stages(totals: Vec<StageTotal>) -> Vec<StageTotal> {
    DealStage::ALL
        .iter()
        .map(|stage| {
            totals
                .iter()
                .find(|total| total.stage == *stage)
                .cloned()
                .unwrap_or(StageTotal {
                    stage: *stage,
                    count: 0,
                    value_cents: 0,
                })
        })
        .collect()
}

fn lookup<S: PartialEq>(counts: &[(S, u64)], status: &S) -> u64 {
    counts
        .iter()
        .find(|(candidate, _)| candidate == status)
        .map(|(_, count)| *count)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryStore, services};
    use time::macros::date;

    #[test]
    fn range_defaults_to_ninety_days() {
        let today = date!(2026 - 06 - 30);
        let range = DateRange::resolve(None, None, today).unwrap();
        assert_eq!(range.to, today);
        assert_eq!(range.from, date!(2026 - 04 - 01));
        assert!(DateRange::resolve(Some(date!(2026 - 07 - 01)), Some(today), today).is_err());
    }

    #[test]
    fn range_bounds_cover_whole_days() {
        let range = DateRange::resolve(Some(date!(2026 - 01 - 01)), Some(date!(2026 - 01 - 31)), date!(2026 - 02 - 01)).unwrap();
        assert_eq!(range.start().date(), date!(2026 - 01 - 01));
        assert_eq!(range.end().date(), date!(2026 - 02 - 01));
    }

    #[test]
    fn range_at_calendar_edges_saturates() {
        let today = date!(2026 - 06 - 30);
        let last = DateRange::resolve(None, Some(Date::MAX), today).unwrap();
        assert_eq!(last.end().date(), Date::MAX);
        assert!(last.end() > last.start());

        let first = DateRange::resolve(None, Some(Date::MIN), today).unwrap();
        assert_eq!(first.from, Date::MIN);
        assert_eq!(first.start().date(), Date::MIN);
    }

    #[tokio::test]
    async fn summary_accepts_the_last_calendar_day() {
        let store = MemoryStore::shared();
        let today = OffsetDateTime::now_utc().date();
        let range = DateRange::resolve(None, Some(date!(9999 - 12 - 31)), today).unwrap();
        let summary = services(&store).analytics.summary(range, today).await.unwrap();
        assert_eq!(summary.range.to, date!(9999 - 12 - 31));
        assert_eq!(summary.deals.win_rate, None);
    }

    #[test]
    fn missing_stages_are_zero_filled() {
        let stages = complete_stages(vec![StageTotal {
            stage: DealStage::Won,
            count: 2,
            value_cents: 300,
        }]);
        assert_eq!(stages.len(), DealStage::ALL.len());
        assert_eq!(stages[0].stage, DealStage::Lead);
        assert_eq!(stages[0].count, 0);
        assert_eq!(
            stages.iter().find(|s| s.stage == DealStage::Won).unwrap().count,
            2
        );
    }

    #[tokio::test]
    async fn summary_computes_win_rate_and_pipeline() {
        let store = MemoryStore::shared();
        let client = store.seed_client("buyer@corp.test");
        let open = store.seed_deal(client.id, None);
        let won = store.seed_deal(client.id, None);
        let lost = store.seed_deal(client.id, None);
        let lost_too = store.seed_deal(client.id, None);
        let now = OffsetDateTime::now_utc();
        store.close_deal(won.id, DealStage::Won, now);
        store.close_deal(lost.id, DealStage::Lost, now);
        store.close_deal(lost_too.id, DealStage::Lost, now);

        let today = now.date();
        let range = DateRange::resolve(None, None, today).unwrap();
        let summary = services(&store).analytics.summary(range, today).await.unwrap();

        assert_eq!(summary.deals.open_pipeline_cents, open.value_cents);
        assert_eq!(summary.deals.won_count, 1);
        assert_eq!(summary.deals.lost_count, 2);
        let rate = summary.deals.win_rate.unwrap();
        assert!((rate - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(summary.contracts.len(), ContractStatus::ALL.len());
    }

    #[tokio::test]
    async fn win_rate_is_null_without_closed_deals() {
        let store = MemoryStore::shared();
        let today = OffsetDateTime::now_utc().date();
        let range = DateRange::resolve(None, None, today).unwrap();
        let summary = services(&store).analytics.summary(range, today).await.unwrap();
        assert_eq!(summary.deals.win_rate, None);
        assert_eq!(summary.tasks.overdue, 0);
    }
}
