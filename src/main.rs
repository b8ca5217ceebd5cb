// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use movefeed::api::{self, AppState};
use movefeed::chain::ChainClient;
use movefeed::config::{Config, StoreBackend};
use movefeed::db::Database;
use movefeed::network::{self, NetworkResolver};
use movefeed::store::{MemoryStore, PgStore, SocialStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,movefeed=debug"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();
    init_tracing();

    let config = Arc::new(Config::from_env()?);
    info!("Initialized configuration");

    let resolver = Arc::new(NetworkResolver::new(
        config.chain.profiles.clone(),
        Some(config.chain.state_file.clone()),
        config.chain.initial_network,
    ));
    network::install(resolver.clone());
    info!("Active network: {}", resolver.network());

    let store: Option<Arc<dyn SocialStore>> = match config.database.backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; social data is lost on restart");
            Some(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let missing = config.database.missing_settings();
            if missing.is_empty() {
                let db = Database::connect(&config.database).await?;
                info!("Connected to database");
                Some(Arc::new(PgStore::new(db)))
            } else {
                warn!("Database not configured (missing {}); social endpoints will answer 500", missing.join(", "));
                None
            }
        }
    };

    let chain = Arc::new(ChainClient::new(resolver.clone(), &config.chain)?);

    let state = AppState {
        store,
        chain,
        resolver,
        config,
    };

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, initiating graceful shutdown"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    };

    if let Err(e) = api::start_api_server(state, shutdown).await {
        error!("API server error: {}", e);
        return Err(e);
    }

    info!("MoveFeed server shutdown complete");
    Ok(())
}
