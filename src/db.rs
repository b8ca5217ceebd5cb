// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use anyhow::{anyhow, Result};
use deadpool::managed::{Object, Pool};
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

pub type DbPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type DbConnection = Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Connection pool for the social tables
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Build the pool, check that a connection can be made and apply pending migrations
    /// when configured to
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| StoreError::NotConfigured(config.missing_settings()))?;

        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(url);
        let pool = DbPool::builder(manager)
            .max_size(config.max_connections as usize)
            .build()?;
        let db = Self { pool };

        let _conn = db.get_connection().await?;
        info!("Successfully connected to the database");

        if config.run_migrations {
            run_migrations(url.to_string()).await?;
        }

        Ok(db)
    }

    /// Get a database connection from the pool
    pub async fn get_connection(&self) -> Result<DbConnection, StoreError> {
        self.pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))
    }
}

/// Apply embedded migrations over a dedicated synchronous connection
async fn run_migrations(url: String) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = PgConnection::establish(&url)?;
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| anyhow!(e))?;
        info!("Database migrations applied successfully ({} new)", applied.len());
        Ok(())
    })
    .await?
}
