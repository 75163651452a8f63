//! Portal configuration.
//!
//! Loaded from a JSON file, then overridden from the environment. Every
//! network-dependent value has a default so a bare
//! `{"network": "mainnet"}` file yields a working portal.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use portal_resolver::NameServiceConfig;
use portal_types::env_utils::env_var;
use portal_types::ObjectId;

use crate::links::DomainSplit;

const MAINNET_FULLNODE: &str = "https://fullnode.mainnet.sui.io:443";
const TESTNET_FULLNODE: &str = "https://fullnode.testnet.sui.io:443";
const MAINNET_AGGREGATOR: &str = "https://aggregator.walrus-mainnet.walrus.space";
const TESTNET_AGGREGATOR: &str = "https://aggregator.walrus-testnet.walrus.space";

const MAINNET_SITE_PACKAGE: &str =
    "0x26eb7ee8688da02c5f671679524e379f0b837a12f1d1d799f255b7eea260ad27";
const TESTNET_SITE_PACKAGE: &str =
    "0xf99aee9f21493e1590e7e5a9aea6f343a1f381031a04a732724871fc294be799";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    #[default]
    Mainnet,
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

/// One upstream RPC endpoint entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcEndpointConfig {
    pub url: String,
    /// Reserved for per-endpoint retry budgets.
    pub retries: Option<u32>,
    /// Label used in logs and metrics instead of the full URL.
    pub metric: Option<String>,
}

impl RpcEndpointConfig {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retries: None,
            metric: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub network: Network,

    /// Walrus Sites package publishing `site::ResourcePath`. Defaults per
    /// network.
    pub site_package: Option<ObjectId>,

    /// Base36 object id of the landing-page site; the bare portal domain
    /// redirects there.
    pub landing_page_oid_b36: Option<String>,

    pub portal_domain: Option<String>,
    pub portal_domain_name_length: Option<usize>,
    pub bring_your_own_domain: bool,

    pub b36_domain_resolution: bool,
    pub hardcoded_subdomains: HashMap<String, ObjectId>,

    pub rpc_urls: Vec<RpcEndpointConfig>,
    pub premium_rpc_urls: Vec<RpcEndpointConfig>,
    pub rpc_request_timeout_ms: u64,

    pub aggregator_urls: Vec<String>,
    pub aggregator_retries: usize,
    pub aggregator_retry_delay_ms: u64,

    pub enable_blocklist: bool,
    pub blocklist_kv_url: Option<String>,
    pub blocklist_kv_token: Option<String>,
    pub blocklist_entries: Vec<String>,

    pub enable_allowlist: bool,
    pub allowlist_kv_url: Option<String>,
    pub allowlist_kv_token: Option<String>,
    pub allowlist_entries: Vec<String>,

    pub cache_ttl_ms: u64,
    pub cache_max_bytes: usize,

    /// Name-service overrides; defaults per network.
    pub suins_package: Option<ObjectId>,
    pub suins_registry: Option<ObjectId>,

    pub listen_address: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            site_package: None,
            landing_page_oid_b36: None,
            portal_domain: None,
            portal_domain_name_length: None,
            bring_your_own_domain: false,
            b36_domain_resolution: true,
            hardcoded_subdomains: HashMap::new(),
            rpc_urls: Vec::new(),
            premium_rpc_urls: Vec::new(),
            rpc_request_timeout_ms: 7000,
            aggregator_urls: Vec::new(),
            aggregator_retries: 2,
            aggregator_retry_delay_ms: 1000,
            enable_blocklist: false,
            blocklist_kv_url: None,
            blocklist_kv_token: None,
            blocklist_entries: Vec::new(),
            enable_allowlist: false,
            allowlist_kv_url: None,
            allowlist_kv_token: None,
            allowlist_entries: Vec::new(),
            cache_ttl_ms: 24 * 60 * 60 * 1000,
            cache_max_bytes: 256 * 1024 * 1024,
            suins_package: None,
            suins_registry: None,
            listen_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl PortalConfig {
    /// Read a JSON config file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let mut config: PortalConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse config file {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables win over file values. Booleans accept
    /// `1/true/yes/on`.
    pub fn apply_env_overrides(&mut self) {
        if let Some(network) = env_var::<NetworkFromEnv>("PORTAL_NETWORK") {
            self.network = network.0;
        }
        if let Some(ms) = env_var::<u64>("PORTAL_RPC_TIMEOUT_MS") {
            self.rpc_request_timeout_ms = ms;
        }
        if let Some(ms) = env_var::<u64>("PORTAL_CACHE_TTL_MS") {
            self.cache_ttl_ms = ms;
        }
        if let Some(bytes) = env_var::<usize>("PORTAL_CACHE_MAX_BYTES") {
            self.cache_max_bytes = bytes;
        }
        if let Some(flag) = env_flag("PORTAL_B36_RESOLUTION") {
            self.b36_domain_resolution = flag;
        }
        if let Some(flag) = env_flag("PORTAL_ENABLE_BLOCKLIST") {
            self.enable_blocklist = flag;
        }
        if let Some(flag) = env_flag("PORTAL_ENABLE_ALLOWLIST") {
            self.enable_allowlist = flag;
        }
        if let Some(url) = env_var::<String>("PORTAL_BLOCKLIST_KV_URL") {
            self.blocklist_kv_url = Some(url);
        }
        if let Some(token) = env_var::<String>("PORTAL_BLOCKLIST_KV_TOKEN") {
            self.blocklist_kv_token = Some(token);
        }
        if let Some(domain) = env_var::<String>("PORTAL_DOMAIN") {
            self.portal_domain = Some(domain);
        }
        if let Some(length) = env_var::<usize>("PORTAL_DOMAIN_NAME_LENGTH") {
            self.portal_domain_name_length = Some(length);
        }
        if let Some(address) = env_var::<String>("PORTAL_LISTEN_ADDRESS") {
            self.listen_address = address;
        }
    }

    pub fn site_package(&self) -> ObjectId {
        self.site_package.unwrap_or_else(|| {
            let default = match self.network {
                Network::Mainnet => MAINNET_SITE_PACKAGE,
                Network::Testnet => TESTNET_SITE_PACKAGE,
            };
            ObjectId::from_hex_literal(default).expect("static id")
        })
    }

    pub fn name_service(&self) -> NameServiceConfig {
        let mut config = match self.network {
            Network::Mainnet => NameServiceConfig::mainnet(),
            Network::Testnet => NameServiceConfig::testnet(),
        };
        if let Some(package) = self.suins_package {
            config.package_id = package;
        }
        if let Some(registry) = self.suins_registry {
            config.registry_id = registry;
        }
        config
    }

    pub fn domain_split(&self) -> DomainSplit {
        DomainSplit {
            portal_domain: self.portal_domain.clone(),
            domain_name_length: self.portal_domain_name_length,
            bring_your_own_domain: self.bring_your_own_domain,
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn aggregator_retry_delay(&self) -> Duration {
        Duration::from_millis(self.aggregator_retry_delay_ms)
    }

    /// Configured RPC URLs, or the network default fullnode.
    pub fn rpc_url_strings(&self) -> Vec<String> {
        if self.rpc_urls.is_empty() {
            vec![self.default_fullnode().to_string()]
        } else {
            self.rpc_urls.iter().map(|e| e.url.clone()).collect()
        }
    }

    /// Premium RPC URLs; empty means no premium tier.
    pub fn premium_rpc_url_strings(&self) -> Vec<String> {
        self.premium_rpc_urls.iter().map(|e| e.url.clone()).collect()
    }

    /// Configured aggregators, or the network default.
    pub fn aggregator_url_strings(&self) -> Vec<String> {
        if self.aggregator_urls.is_empty() {
            vec![self.default_aggregator().to_string()]
        } else {
            self.aggregator_urls.clone()
        }
    }

    fn default_fullnode(&self) -> &'static str {
        match self.network {
            Network::Mainnet => MAINNET_FULLNODE,
            Network::Testnet => TESTNET_FULLNODE,
        }
    }

    fn default_aggregator(&self) -> &'static str {
        match self.network {
            Network::Mainnet => MAINNET_AGGREGATOR,
            Network::Testnet => TESTNET_AGGREGATOR,
        }
    }
}

/// FromStr shim so `env_var` can parse the network name.
struct NetworkFromEnv(Network);

impl FromStr for NetworkFromEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::from_str(s).map(NetworkFromEnv)
    }
}

/// A boolean override that distinguishes "unset" from "false".
fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    let value = value.trim().to_ascii_lowercase();
    Some(matches!(value.as_str(), "1" | "true" | "yes" | "on"))
}
