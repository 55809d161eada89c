use std::time::Duration;

use solutions_portal::{http, Config, PortalContext, SeaOrmStore};
use tokio::{net::TcpListener, signal};
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXPIRED_SESSION_SWEEP: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = Config::from_env()?;
    let ctx = PortalContext::connect(&config).await?;

    #[cfg(feature = "migration")]
    {
        use solutions_portal::migration::{Migrator, MigratorTrait};

        Migrator::up(ctx.db(), None).await?;
        info!("Migrations applied");
    }

    let store = SeaOrmStore::new(ctx.db().clone());
    let sweeper = tokio::spawn(sweep_expired_sessions(store.clone()));

    let session_layer = SessionManagerLayer::new(store)
        .with_secure(config.session_secure)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            config.session_inactivity_hours,
        )));

    let proxy = http::ProxyAuth::new(config.proxy_secret.as_str());
    let app = http::router(ctx.clone(), proxy).layer(session_layer);

    let listener = TcpListener::bind(config.addr).await?;
    info!("Server running on http://{}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    ctx.close().await?;
    info!("Server shut down");
    Ok(())
}

async fn sweep_expired_sessions(store: SeaOrmStore) {
    let mut interval = tokio::time::interval(EXPIRED_SESSION_SWEEP);
    loop {
        interval.tick().await;
        if let Err(e) = store.delete_expired().await {
            warn!("Expired session sweep failed: {e}");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
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
