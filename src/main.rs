use std::{path::Path, process, sync::Arc, time::Duration};

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_cron::CronStream;
use lectern::{
    application::{
        context::Services,
        error::AppError,
        jobs::{ExpireContractsContext, parse_schedule, process_expire_contracts_job},
        tokens::BearerSecret,
    },
    config::{self, ConvertArgs, ConvertFormat, LoadError},
    domain::rich_text::RichDocument,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiRateLimiter, ApiState, HttpState, RouterState, WebhookState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn config_error(err: LoadError) -> AppError {
    AppError::from(InfraError::configuration(err.to_string()))
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(config_error)?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Convert(args) => run_convert(args).await,
    }
}

async fn connect(settings: &config::Settings) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings.require_database_url().map_err(config_error)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect(&settings).await?;
    info!("database migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let admin_token = BearerSecret::new(settings.require_admin_token().map_err(config_error)?);
    let schedule = parse_schedule(&settings.jobs.contract_expiry_cron)
        .map_err(|err| AppError::from(InfraError::configuration(err)))?;

    let repositories = connect(&settings).await?;
    let services = Arc::new(Services::build(
        repositories.clone(),
        repositories,
        settings.portal.public_base_url.clone(),
    ));

    let expire_ctx = ExpireContractsContext {
        contracts: Arc::new(services.contracts.clone()),
    };
    let expire_worker = WorkerBuilder::new("expire-contracts-worker")
        .data(expire_ctx)
        .backend(CronStream::new(schedule))
        .build_fn(process_expire_contracts_job);
    let monitor = Monitor::new().register(expire_worker);
    let monitor_handle = tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    });

    let router_state = RouterState {
        http: HttpState {
            services: services.clone(),
        },
        webhooks: WebhookState {
            services: services.clone(),
            outrank_secret: settings.webhooks.outrank_token.as_deref().map(BearerSecret::new),
            leads_secret: settings.webhooks.leads_token.as_deref().map(BearerSecret::new),
        },
        api: ApiState {
            services,
            admin_token,
            rate_limiter: Arc::new(ApiRateLimiter::from_settings(&settings.api_rate_limit)),
        },
    };

    let result = serve_http(&settings, router_state).await;
    monitor_handle.abort();
    result
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let stopping = Arc::new(Notify::new());
    let signal = {
        let stopping = stopping.clone();
        async move {
            shutdown_signal().await;
            stopping.notify_one();
        }
    };
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(signal);
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(stopping, grace) => {
            warn!(
                timeout_secs = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn drain_deadline(stopping: Arc<Notify>, grace: Duration) {
    stopping.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

async fn run_convert(args: ConvertArgs) -> Result<(), AppError> {
    let source = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let document = if args.html || is_html_path(&args.file) {
        RichDocument::from_html(&source)
    } else {
        RichDocument::from_markdown(&source)
    };

    let output = match args.format {
        ConvertFormat::Json => serde_json::to_string_pretty(&document.to_portable_text())
            .map_err(|err| AppError::unexpected(err.to_string()))?,
        ConvertFormat::Html => document.render_html(),
    };
    println!("{output}");
    Ok(())
}

fn is_html_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}
