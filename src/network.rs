// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

//! Network profiles and the process-wide selection between them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::address::to_canonical_address;

/// Key under which the selected network is persisted
pub const NETWORK_STORAGE_KEY: &str = "movefeed_network";

/// Same-origin path the browser uses instead of the node RPC URL
pub const RPC_PROXY_PATH: &str = "/api/rpc";

/// Same-origin path the browser uses instead of the indexer URL
pub const INDEXER_PROXY_PATH: &str = "/api/indexer";

const DEFAULT_MODULE_ADDRESS: &str = "0xfeed";

#[derive(Debug, Error)]
#[error("unknown network {0:?}, expected \"testnet\" or \"mainnet\"")]
pub struct UnknownNetwork(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub network: Network,
    pub chain_id: u8,
    pub rpc_url: String,
    pub indexer_url: String,
    pub module_address: String,
    pub explorer_url: String,
}

impl NetworkProfile {
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            chain_id: 250,
            rpc_url: "https://testnet.movementnetwork.xyz/v1".to_string(),
            indexer_url: "https://indexer.testnet.movementnetwork.xyz/v1/graphql".to_string(),
            module_address: to_canonical_address(DEFAULT_MODULE_ADDRESS),
            explorer_url: "https://explorer.movementnetwork.xyz".to_string(),
        }
    }

    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            chain_id: 126,
            rpc_url: "https://mainnet.movementnetwork.xyz/v1".to_string(),
            indexer_url: "https://indexer.mainnet.movementnetwork.xyz/v1/graphql".to_string(),
            module_address: to_canonical_address(DEFAULT_MODULE_ADDRESS),
            explorer_url: "https://explorer.movementnetwork.xyz".to_string(),
        }
    }

    /// The profile as handed to a browser: node and indexer reached through
    /// same-origin proxy paths
    pub fn for_browser(&self) -> Self {
        Self {
            rpc_url: RPC_PROXY_PATH.to_string(),
            indexer_url: INDEXER_PROXY_PATH.to_string(),
            ..self.clone()
        }
    }

    pub fn explorer_tx_url(&self, hash: &str) -> String {
        format!("{}/txn/{}?network={}", self.explorer_url, hash, self.network)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfiles {
    pub testnet: NetworkProfile,
    pub mainnet: NetworkProfile,
}

impl Default for NetworkProfiles {
    fn default() -> Self {
        Self {
            testnet: NetworkProfile::testnet(),
            mainnet: NetworkProfile::mainnet(),
        }
    }
}

impl NetworkProfiles {
    pub fn get(&self, network: Network) -> &NetworkProfile {
        match network {
            Network::Testnet => &self.testnet,
            Network::Mainnet => &self.mainnet,
        }
    }
}

type ChangeListener = Box<dyn Fn(&NetworkProfile) + Send + Sync>;

/// Holds the active network for the whole process. Every component asks the resolver
/// for the module address and RPC URL instead of keeping its own copy.
pub struct NetworkResolver {
    profiles: NetworkProfiles,
    selected: RwLock<Network>,
    state_file: Option<PathBuf>,
    listeners: RwLock<Vec<ChangeListener>>,
}

impl NetworkResolver {
    /// Build a resolver. The persisted selection wins over `initial`; testnet is the
    /// fallback when neither exists.
    pub fn new(profiles: NetworkProfiles, state_file: Option<PathBuf>, initial: Option<Network>) -> Self {
        let persisted = state_file.as_ref().and_then(|path| read_persisted(path));
        let selected = persisted.or(initial).unwrap_or_default();
        debug!("Active network at startup: {}", selected);

        Self {
            profiles,
            selected: RwLock::new(selected),
            state_file,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn network(&self) -> Network {
        *self.selected.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Active profile with direct node URLs
    pub fn active_profile(&self) -> NetworkProfile {
        self.profiles.get(self.network()).clone()
    }

    /// Active profile with same-origin proxy URLs
    pub fn browser_profile(&self) -> NetworkProfile {
        self.active_profile().for_browser()
    }

    pub fn profiles(&self) -> &NetworkProfiles {
        &self.profiles
    }

    /// Switch networks, persist the choice and notify listeners. Returns the new profile.
    pub fn set(&self, network: Network) -> NetworkProfile {
        {
            let mut selected = self.selected.write().unwrap_or_else(|e| e.into_inner());
            if *selected == network {
                return self.profiles.get(network).clone();
            }
            *selected = network;
        }
        info!("Switched active network to {}", network);

        if let Some(path) = &self.state_file {
            if let Err(e) = write_persisted(path, network) {
                warn!("Failed to persist network selection to {}: {}", path.display(), e);
            }
        }

        let profile = self.profiles.get(network).clone();
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(&profile);
        }
        profile
    }

    /// Register a callback run after every network change
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&NetworkProfile) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(listener));
    }
}

fn read_persisted(path: &PathBuf) -> Option<Network> {
    let raw = std::fs::read_to_string(path).ok()?;
    let state: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(e) => {
            warn!("Ignoring unreadable state file {}: {}", path.display(), e);
            return None;
        }
    };
    state.get(NETWORK_STORAGE_KEY)?.as_str()?.parse().ok()
}

fn write_persisted(path: &PathBuf, network: Network) -> std::io::Result<()> {
    let mut state: BTreeMap<String, serde_json::Value> = std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    state.insert(NETWORK_STORAGE_KEY.to_string(), serde_json::Value::from(network.as_str()));
    let encoded = serde_json::to_string_pretty(&state)?;
    std::fs::write(path, encoded)
}

static CURRENT: OnceCell<Arc<NetworkResolver>> = OnceCell::new();

/// Make `resolver` the process-wide instance. Returns false if one was already installed.
pub fn install(resolver: Arc<NetworkResolver>) -> bool {
    CURRENT.set(resolver).is_ok()
}

/// The process-wide resolver, if one was installed at startup
pub fn current() -> Option<Arc<NetworkResolver>> {
    CURRENT.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn defaults_to_testnet() {
        let resolver = NetworkResolver::new(NetworkProfiles::default(), None, None);
        assert_eq!(resolver.network(), Network::Testnet);
        assert_eq!(resolver.active_profile().chain_id, 250);
    }

    #[test]
    fn browser_profile_uses_proxy_paths() {
        let resolver = NetworkResolver::new(NetworkProfiles::default(), None, Some(Network::Mainnet));
        let browser = resolver.browser_profile();
        assert_eq!(browser.rpc_url, RPC_PROXY_PATH);
        assert_eq!(browser.indexer_url, INDEXER_PROXY_PATH);
        assert_eq!(browser.module_address, resolver.active_profile().module_address);
        assert!(resolver.active_profile().rpc_url.starts_with("https://"));
    }

    #[test]
    fn selection_is_persisted_and_listeners_fire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"other_key": 3}"#).unwrap();

        let resolver = NetworkResolver::new(NetworkProfiles::default(), Some(path.clone()), None);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        resolver.on_change(move |profile| {
            assert_eq!(profile.network, Network::Mainnet);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        resolver.set(Network::Mainnet);
        resolver.set(Network::Mainnet);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"movefeed_network\": \"mainnet\""));
        assert!(raw.contains("other_key"));

        let reloaded = NetworkResolver::new(NetworkProfiles::default(), Some(path), Some(Network::Testnet));
        assert_eq!(reloaded.network(), Network::Mainnet);
    }

    #[test]
    fn parses_network_names() {
        assert_eq!("MainNet".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn explorer_links_name_the_network() {
        let url = NetworkProfile::mainnet().explorer_tx_url("0xabc");
        assert_eq!(url, "https://explorer.movementnetwork.xyz/txn/0xabc?network=mainnet");
    }

    #[test]
    fn only_the_first_install_wins() {
        let first = Arc::new(NetworkResolver::new(NetworkProfiles::default(), None, Some(Network::Mainnet)));
        let second = Arc::new(NetworkResolver::new(NetworkProfiles::default(), None, None));
        assert!(install(first.clone()));
        assert!(!install(second));
        let current = current().unwrap();
        assert!(Arc::ptr_eq(&current, &first));
    }
}
