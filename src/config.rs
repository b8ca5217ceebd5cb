// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::network::{Network, NetworkProfile, NetworkProfiles};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server-only connection string, credentials included
    #[serde(skip_serializing)]
    pub url: Option<String>,
    /// Anonymous read URL handed to clients
    pub public_url: Option<String>,
    pub max_connections: u32,
    pub backend: StoreBackend,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Refuse unsigned payloads on every write handler
    pub require_signatures: bool,
    #[serde(skip_serializing)]
    pub viewer_hash_salt: String,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub public_base_url: String,
    /// Shared secret for switching the process-wide network; switching is refused
    /// when unset
    #[serde(skip_serializing)]
    pub network_admin_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub initial_network: Option<Network>,
    pub state_file: PathBuf,
    pub module_name: String,
    pub profiles: NetworkProfiles,
    pub confirm_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub feed_cache_ttl_ms: u64,
}

impl DatabaseConfig {
    /// Names of the settings a database-backed handler cannot run without
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.backend == StoreBackend::Postgres && self.url.as_deref().map_or(true, str::is_empty) {
            missing.push("DATABASE_URL");
        }
        missing
    }
}

impl ChainConfig {
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn feed_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.feed_cache_ttl_ms)
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = var_or(name, default);
    value.trim().parse().map_err(|_| ConfigError::Invalid { name, expected, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenv::dotenv();

        let backend = match var_or("STORE_BACKEND", "postgres").to_ascii_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    expected: "\"postgres\" or \"memory\"",
                    value: other.to_string(),
                })
            }
        };

        let initial_network = match optional_var("MOVEFEED_NETWORK") {
            Some(raw) => Some(raw.parse::<Network>().map_err(|_| ConfigError::Invalid {
                name: "MOVEFEED_NETWORK",
                expected: "\"testnet\" or \"mainnet\"",
                value: raw,
            })?),
            None => None,
        };

        let mut profiles = NetworkProfiles::default();
        apply_profile_overrides(&mut profiles.testnet, "TESTNET");
        apply_profile_overrides(&mut profiles.mainnet, "MAINNET");

        Ok(Config {
            database: DatabaseConfig {
                url: optional_var("DATABASE_URL"),
                public_url: optional_var("DATABASE_PUBLIC_URL"),
                max_connections: parsed_var("DATABASE_MAX_CONNECTIONS", "10", "a number")?,
                backend,
                run_migrations: parsed_var("RUN_MIGRATIONS", "true", "true or false")?,
            },
            server: ServerConfig {
                host: var_or("SERVER_HOST", "127.0.0.1"),
                port: parsed_var("SERVER_PORT", "8080", "a port number")?,
                enable_cors: parsed_var("ENABLE_CORS", "true", "true or false")?,
                require_signatures: parsed_var("REQUIRE_SIGNATURES", "false", "true or false")?,
                viewer_hash_salt: var_or("VIEWER_HASH_SALT", "movefeed-views"),
                upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "./uploads")),
                upload_max_bytes: parsed_var("UPLOAD_MAX_BYTES", "10485760", "a number of bytes")?,
                public_base_url: var_or("PUBLIC_BASE_URL", ""),
                network_admin_token: optional_var("NETWORK_ADMIN_TOKEN"),
            },
            chain: ChainConfig {
                initial_network,
                state_file: PathBuf::from(var_or("MOVEFEED_STATE_FILE", "./movefeed-state.json")),
                module_name: var_or("MOVEFEED_MODULE_NAME", "feed"),
                profiles,
                confirm_timeout_ms: parsed_var("CHAIN_CONFIRM_TIMEOUT_MS", "30000", "a number")?,
                poll_interval_ms: parsed_var("CHAIN_POLL_INTERVAL_MS", "500", "a number")?,
                feed_cache_ttl_ms: parsed_var("FEED_CACHE_TTL_MS", "2000", "a number")?,
            },
        })
    }

    /// Configuration for tests and local runs: in-memory store, no persisted state
    pub fn local(state_file: PathBuf) -> Self {
        Config {
            database: DatabaseConfig {
                url: None,
                public_url: None,
                max_connections: 1,
                backend: StoreBackend::Memory,
                run_migrations: false,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                enable_cors: true,
                require_signatures: false,
                viewer_hash_salt: "test-salt".to_string(),
                upload_dir: std::env::temp_dir().join("movefeed-uploads"),
                upload_max_bytes: 1024 * 1024,
                public_base_url: String::new(),
                network_admin_token: None,
            },
            chain: ChainConfig {
                initial_network: Some(Network::Testnet),
                state_file,
                module_name: "feed".to_string(),
                profiles: NetworkProfiles::default(),
                confirm_timeout_ms: 5_000,
                poll_interval_ms: 20,
                feed_cache_ttl_ms: 0,
            },
        }
    }
}

fn apply_profile_overrides(profile: &mut NetworkProfile, suffix: &str) {
    if let Some(address) = optional_var(&format!("MOVEFEED_{}_MODULE_ADDRESS", suffix)) {
        profile.module_address = crate::address::to_canonical_address(&address);
    }
    if let Some(url) = optional_var(&format!("MOVEFEED_{}_RPC_URL", suffix)) {
        profile.rpc_url = url;
    }
    if let Some(url) = optional_var(&format!("MOVEFEED_{}_INDEXER_URL", suffix)) {
        profile.indexer_url = url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_url_is_named() {
        let mut config = Config::local(PathBuf::from("unused.json"));
        assert!(config.database.missing_settings().is_empty());

        config.database.backend = StoreBackend::Postgres;
        assert_eq!(config.database.missing_settings(), vec!["DATABASE_URL"]);

        config.database.url = Some("postgres://localhost/movefeed".into());
        assert!(config.database.missing_settings().is_empty());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = Config::local(PathBuf::from("unused.json"));
        config.database.url = Some("postgres://user:secret@db/movefeed".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("test-salt"));
    }
}
