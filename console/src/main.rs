//! Wmsync Console binary.
//!
//! Runs the sync core against a live backend and logs connection and
//! identity changes until interrupted.

use std::env;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wmsync_console::{SyncApp, SyncConfig};
use wmsync_sdk::client::{ApiLayer, WmsClient};
use wmsync_sdk::realtime::{Connector, SocketConnector, StreamConnector, TransportVariant};
use wmsync_sdk::token::{MemoryTokenStore, TokenStore, Tokens};

/// Environment variable holding the session's access token.
const ENV_ACCESS_TOKEN: &str = "WMSYNC_ACCESS_TOKEN";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wmsync_console=debug,wmsync_sdk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env()?;
    config.validate()?;

    info!("Starting Wmsync Console");
    info!("API URL: {}", config.api.base_url);
    info!("Realtime URL: {}", config.realtime.base_url);
    info!("Transport: {:?}", config.realtime.variant);

    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let api: Arc<dyn ApiLayer> = Arc::new(WmsClient::new(config.api.clone(), Arc::clone(&tokens))?);
    let connector: Arc<dyn Connector> = match config.realtime.variant {
        TransportVariant::Socket => Arc::new(SocketConnector::new()),
        TransportVariant::Stream => Arc::new(StreamConnector::new()),
    };

    let app = SyncApp::start(config, api, tokens, connector)?;

    let mut state = app.realtime().watch_state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            info!("Realtime {}", current);
        }
    });

    let mut identity = app.me().watch_identity();
    tokio::spawn(async move {
        while identity.changed().await.is_ok() {
            match identity.borrow_and_update().as_ref() {
                Some(me) => info!("Logged in as {} ({})", me.id, me.user_type),
                None => info!("Logged out"),
            }
        }
    });

    match env::var(ENV_ACCESS_TOKEN) {
        Ok(token) => app.login(Tokens::new(token)).await,
        Err(_) => warn!("{} not set; running without a session", ENV_ACCESS_TOKEN),
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    app.shutdown().await;

    Ok(())
}
