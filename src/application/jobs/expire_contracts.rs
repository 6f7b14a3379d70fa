//! Cron job moving lapsed `sent` contracts to `expired`.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::*;
use apalis_cron::Schedule;
use time::OffsetDateTime;

use crate::application::admin::contracts::ContractService;

pub const DEFAULT_EXPIRY_CRON: &str = "0 0 * * * *";

/// Marker for the cron-triggered expiry run.
#[derive(Default, Debug, Clone)]
pub struct ExpireContractsJob;

impl From<chrono::DateTime<chrono::Utc>> for ExpireContractsJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct ExpireContractsContext {
    pub contracts: Arc<ContractService>,
}

pub async fn process_expire_contracts_job(
    _job: ExpireContractsJob,
    ctx: Data<ExpireContractsContext>,
) -> Result<(), apalis::prelude::Error> {
    match ctx.contracts.expire_overdue(OffsetDateTime::now_utc()).await {
        Ok(count) if count > 0 => {
            metrics::counter!("lectern_contracts_expired_total").increment(count as u64);
            tracing::info!(
                target = "lectern::jobs::contracts",
                expired_count = count,
                "expired overdue contracts"
            );
        }
        Err(err) => {
            tracing::warn!(
                target = "lectern::jobs::contracts",
                error = %err,
                "failed to expire contracts"
            );
        }
        _ => {}
    }
    Ok(())
}

pub fn parse_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression).map_err(|err| err.to_string())
}
