//! # talkboard
//!
//! The server binary. Adapters are chosen at compile time by Cargo features
//! and composed explicitly into the services and the HTTP router.

#[cfg(not(all(feature = "web-axum", feature = "auth-jwt")))]
compile_error!("the talkboard binary needs the `web-axum` and `auth-jwt` features");

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use configs::{DatabaseSettings, LogFormat, LogSettings, Settings};
use domains::ports::Store;
use services::Services;
use storage_adapters::MemoryStore;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    let store = build_store(&settings.database).await?;
    let hasher = Arc::new(Argon2Hasher::new());
    let tokens = Arc::new(JwtTokenService::new(
        &settings.auth.jwt_secret,
        chrono::Duration::seconds(settings.auth.token_ttl_secs),
    ));
    let state = AppState::new(Services::new(store, hasher, tokens));
    let app = router(state);

    let address = settings.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "talkboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    info!("talkboard stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter when set.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn build_store(database: &DatabaseSettings) -> anyhow::Result<Arc<dyn Store>> {
    if let Some(store) = connect_postgres(database).await? {
        return Ok(store);
    }
    warn!("no database configured, using the in-memory store");
    Ok(Arc::new(MemoryStore::new()))
}

#[cfg(feature = "db-postgres")]
async fn connect_postgres(database: &DatabaseSettings) -> anyhow::Result<Option<Arc<dyn Store>>> {
    use secrecy::ExposeSecret;
    use storage_adapters::PgStore;

    let Some(url) = database.url.as_ref() else {
        return Ok(None);
    };
    let store = PgStore::connect(url.expose_secret(), database.max_connections)
        .await
        .context("connecting to postgres")?;
    store.migrate().await.context("running migrations")?;
    info!(max_connections = database.max_connections, "postgres store ready");
    Ok(Some(Arc::new(store)))
}

#[cfg(not(feature = "db-postgres"))]
async fn connect_postgres(database: &DatabaseSettings) -> anyhow::Result<Option<Arc<dyn Store>>> {
    if database.url.is_some() {
        warn!("database.url is set but this build has no postgres support");
    }
    Ok(None)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received ctrl-c, shutting down"),
            Err(err) => error!(error = %err, "failed to listen for ctrl-c"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                error!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
