//! API server entry point.

use api::config::Config;
use ledger::{InMemoryLedger, LedgerStore, PostgresLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use service::{InMemoryPublisher, OutboxRelay};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<L: LedgerStore + Clone + 'static>(
    ledger: L,
    config: Config,
    metrics_handle: PrometheusHandle,
) {
    // The relay lives beside the HTTP server with its own lifecycle;
    // command handlers never wait on the bus.
    let publisher = InMemoryPublisher::new();
    let relay = OutboxRelay::new(ledger.clone(), publisher, config.relay_config());
    let relay_handle = relay.start();

    let state = api::create_state(ledger);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting order command server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Stop the relay only after the server drained, so an in-flight
    // cycle finishes and no acknowledged publish goes unmarked.
    relay_handle.shutdown().await;

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load configuration and pick the ledger backend
    let config = Config::from_env();

    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to database");

            let ledger = PostgresLedger::new(pool);
            ledger.run_migrations().await.expect("migrations failed");

            serve(ledger, config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory ledger");
            serve(InMemoryLedger::new(), config, metrics_handle).await;
        }
    }
}
