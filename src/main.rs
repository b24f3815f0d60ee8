//! Lattice Licensing - license enforcement and invitation approval service
//!
//! This service counts an organization's consumption of plan-limited
//! resources, decides whether mutating actions may proceed, and drives the
//! member-invitation approval workflow.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use lattice_licensing::config::{LogFormat, LogTarget, LoggingConfig};
use lattice_licensing::services::{
    DbPlanProvider, InvitationService, InviteNotifier, LicenseService, MemberLimitGuard,
    NoopNotifier, PlanProvider, SmtpNotifier,
};
use lattice_licensing::{app_router, db, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize logging based on configuration
    // The guard must be kept alive for the duration of the program
    // to ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("Lattice Licensing starting up");

    // Initialize database connection pool
    info!("Initializing database connection");
    let db = db::init_pool(&config.database.url)
        .await
        .context("Failed to initialize database")?;

    // Plan resolution is injected everywhere it is consulted; nothing reads
    // shared plan state.
    let plans: Arc<dyn PlanProvider> = Arc::new(DbPlanProvider::new(db.clone()));

    let notifier: Arc<dyn InviteNotifier> = match &config.smtp {
        Some(smtp) => {
            info!("Initializing SMTP notifier: {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpNotifier::from_config(smtp).context("Failed to initialize SMTP")?)
        }
        None => {
            info!("SMTP not configured, invite emails will be skipped");
            Arc::new(NoopNotifier)
        }
    };

    let state = AppState {
        config: config.clone(),
        db: db.clone(),
        license: LicenseService::new(db.clone(), plans.clone()),
        invitations: InvitationService::new(db.clone(), plans.clone(), notifier),
        member_guard: MemberLimitGuard::new(db, plans),
    };

    let app = app_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match &config.logging.target {
        LogTarget::Console => {
            // Console-only logging (development mode)
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &config.logging.format);
            None
        }
        LogTarget::File => {
            // File logging with daily rotation (production mode)
            let (writer, guard) = create_file_writer(&config.logging);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &config.logging.format, writer);
            Some(guard)
        }
    }
}

/// Create a file writer with daily rotation
fn create_file_writer(
    log_config: &LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    // Ensure log directory exists
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix);
    tracing_appender::non_blocking(file_appender)
}

/// Initialize console-only logging
fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber
        + for<'a> tracing_subscriber::registry::LookupSpan<'a>
        + Send
        + Sync
        + 'static,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
    }
}

/// Initialize file-only logging
fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber
        + for<'a> tracing_subscriber::registry::LookupSpan<'a>
        + Send
        + Sync
        + 'static,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_writer(writer).with_target(true))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(false),
                )
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .init();
        }
    }
}
