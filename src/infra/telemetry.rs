use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "lectern_webhook_articles_total",
            Unit::Count,
            "Outrank articles processed, labelled by outcome."
        );
        describe_counter!(
            "lectern_leads_received_total",
            Unit::Count,
            "Inbound CRM leads accepted."
        );
        describe_counter!(
            "lectern_campaigns_sent_total",
            Unit::Count,
            "Newsletter campaigns handed off for delivery."
        );
        describe_counter!(
            "lectern_contracts_expired_total",
            Unit::Count,
            "Sent contracts moved to expired by the scheduler."
        );
        describe_counter!(
            "lectern_api_rate_limited_total",
            Unit::Count,
            "Admin API requests rejected by the rate limiter."
        );
        describe_histogram!(
            "lectern_http_request_ms",
            Unit::Milliseconds,
            "HTTP request latency in milliseconds."
        );
    });
}
