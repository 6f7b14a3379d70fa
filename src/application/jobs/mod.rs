mod expire_contracts;

pub use expire_contracts::{
    DEFAULT_EXPIRY_CRON, ExpireContractsContext, ExpireContractsJob, parse_schedule,
    process_expire_contracts_job,
};
