//! Hotel Review Service Binary
//!
//! Runs the review lifecycle as a REST API service:
//! - Structured JSON logging
//! - Request tracing with `x-request-id` correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SECRET_KEY`: Token signing secret (required; without it every submission is rejected)
//! - `DATABASE_URL`: PostgreSQL connection string (optional, needs the `postgres` feature)
//! - `PORT`: Service port (default: 8080)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! SECRET_KEY=... cargo run --bin hotel_review_service --features service
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use hotel_reviews::service::{
    create_router, metrics_middleware, request_logging_middleware, ServiceState,
};
use hotel_reviews::{
    sample_hotels, HotelCatalog, InMemoryHotelCatalog, InMemoryReviewStore, LogFormat, ReviewStore,
    ServiceConfig,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "hotel_review_service=info,hotel_reviews=info,tower_http=info,sqlx=warn".into()
    });

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .init();
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Seed the catalog, build the router and serve until shutdown.
async fn serve<S: ReviewStore + 'static>(
    config: &ServiceConfig,
    store: S,
    catalog: Arc<dyn HotelCatalog>,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.seed_sample_hotels {
        match catalog.seed_if_empty(sample_hotels()).await {
            Ok(0) => info!("Sample hotels already exist"),
            Ok(added) => info!(added = added, "Sample hotels added"),
            Err(e) => tracing::error!(error = %e, "Error adding sample hotels"),
        }
    }

    let state = ServiceState::from_config(config, store, catalog);

    // The original frontend calls the API cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        visibility = ?config.visibility,
        "Hotel Review Service listening"
    );

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(feature = "postgres")]
async fn serve_postgres(
    config: &ServiceConfig,
    pg_config: hotel_reviews::store::postgres::PostgresConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    use hotel_reviews::{PostgresHotelCatalog, PostgresReviewStore};

    info!("Connecting to PostgreSQL...");
    let connect_start = std::time::Instant::now();

    let store = match tokio::time::timeout(
        std::time::Duration::from_secs(30),
        PostgresReviewStore::connect(&pg_config),
    )
    .await
    {
        Ok(Ok(store)) => store,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            return Err(e.into());
        }
        Err(_) => {
            tracing::error!("PostgreSQL connection timeout after 30s");
            return Err("Database connection timeout".into());
        }
    };
    store.ensure_schema().await?;

    info!(
        latency_ms = connect_start.elapsed().as_millis() as u64,
        "PostgreSQL connection established"
    );

    let catalog = Arc::new(PostgresHotelCatalog::from_pool(store.pool().clone()));
    serve(config, store, catalog).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env();
    init_tracing(config.log_format);

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(
        version = version,
        build_sha = build_sha,
        "Starting Hotel Review Service"
    );

    #[cfg(feature = "postgres")]
    {
        if let Some(pg_config) = hotel_reviews::store::postgres::PostgresConfig::from_env() {
            serve_postgres(&config, pg_config).await?;
            info!("Hotel Review Service shutdown complete");
            return Ok(());
        }
    }

    tracing::warn!("No database configured, reviews are kept in memory only");
    serve(
        &config,
        InMemoryReviewStore::new(),
        Arc::new(InMemoryHotelCatalog::new()),
    )
    .await?;

    info!("Hotel Review Service shutdown complete");

    Ok(())
}
