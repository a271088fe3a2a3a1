//! Run configuration
//!
//! Resolves what a deploy run needs to know before it starts: which network
//! to target and how to reach it, where scripts and deployments live, and
//! which tags to run.
//!
//! The node URL is looked up in order:
//! 1. `ETH_NODE_URI_<network>` environment variable
//! 2. `networks.<network>.rpcUrl` in `rocketh.json`
//! 3. `http://127.0.0.1:8545` when the network is `localhost` or `memory`

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Network name used when none is given; deployments are kept in memory
pub const MEMORY_NETWORK: &str = "memory";

/// Default configuration file, read from the working directory
pub const CONFIG_FILE: &str = "rocketh.json";

const LOCALHOST_URL: &str = "http://127.0.0.1:8545";

/// Options as given by the user (CLI flags or library callers)
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub network: String,
    pub deployments: Option<String>,
    pub scripts: Option<String>,
    /// Comma-separated tag filter
    pub tags: Option<String>,
}

/// `rocketh.json` contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub rpc_url: String,
}

impl ConfigFile {
    /// Loads a config file, returning `None` when it does not exist
    ///
    /// A file that exists but cannot be parsed is ignored with a warning.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("ignoring {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Resolved configuration of a deploy run
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint of the target network; empty when not needed
    pub node_url: String,

    pub network_name: String,

    /// Root folder of deployments; records live in `<deployments>/<network>/`
    pub deployments: PathBuf,

    /// Root folder of deploy scripts
    pub scripts: PathBuf,

    /// Tag filter; empty means every script
    pub tags: Vec<String>,

    /// Delay between two receipt queries while waiting for a transaction
    pub poll_interval: Duration,

    /// How long recovery waits for a still-outstanding transaction before
    /// leaving it pending; `None` waits until it resolves
    pub recovery_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(network_name: impl Into<String>, node_url: impl Into<String>) -> Self {
        Self {
            node_url: node_url.into(),
            network_name: network_name.into(),
            deployments: PathBuf::from("deployments"),
            scripts: PathBuf::from("deploy"),
            tags: Vec::new(),
            poll_interval: Duration::from_secs(1),
            recovery_timeout: None,
        }
    }

    /// Builds a configuration from user options
    ///
    /// Reads `rocketh.json` from the working directory and the
    /// `ETH_NODE_URI_<network>` / `ROCKETH_*` environment variables.
    ///
    /// # Arguments
    /// * `options` - User options
    /// * `ignore_missing_rpc` - Accept networks without a node URL (for
    ///   commands that never touch the network)
    pub fn from_options(options: &ConfigOptions, ignore_missing_rpc: bool) -> anyhow::Result<Self> {
        let file = ConfigFile::load(Path::new(CONFIG_FILE));
        let network_name = if options.network.is_empty() {
            MEMORY_NETWORK.to_string()
        } else {
            options.network.clone()
        };

        let from_env = std::env::var(format!("ETH_NODE_URI_{}", network_name)).ok();
        let node_url = resolve_node_url(
            &network_name,
            from_env,
            file.as_ref(),
            ignore_missing_rpc,
        )?;

        let mut config = Self::new(network_name, node_url);
        if let Some(deployments) = &options.deployments {
            config.deployments = PathBuf::from(deployments);
        }
        if let Some(scripts) = &options.scripts {
            config.scripts = PathBuf::from(scripts);
        }
        if let Some(tags) = &options.tags {
            config.tags = parse_tags(tags);
        }

        if let Some(ms) = env_number("ROCKETH_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env_number("ROCKETH_RECOVERY_TIMEOUT_SECS")? {
            config.recovery_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Adds tags to the filter
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Returns true when deployments are only kept in memory
    pub fn is_memory_network(&self) -> bool {
        self.network_name == MEMORY_NETWORK
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network_name.is_empty() {
            anyhow::bail!("network name cannot be empty");
        }

        if !self.node_url.is_empty()
            && !self.node_url.starts_with("http://")
            && !self.node_url.starts_with("https://")
        {
            anyhow::bail!("node url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if let Some(tag) = self.tags.iter().find(|t| t.contains(',')) {
            anyhow::bail!("tag '{}' cannot contain commas", tag);
        }

        Ok(())
    }
}

/// Parses a comma-separated tag filter into tags
///
/// Blank entries are dropped, so `""` selects every script.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves the node URL of a network
///
/// # Errors
/// Fails when no URL is configured for the network, unless
/// `ignore_missing_rpc` is set (an empty URL is returned then).
pub fn resolve_node_url(
    network: &str,
    from_env: Option<String>,
    file: Option<&ConfigFile>,
    ignore_missing_rpc: bool,
) -> anyhow::Result<String> {
    if let Some(url) = from_env {
        return Ok(url);
    }

    if let Some(network_config) = file.and_then(|f| f.networks.get(network)) {
        return Ok(network_config.rpc_url.clone());
    }

    if ignore_missing_rpc {
        return Ok(String::new());
    }

    if network == "localhost" || network == MEMORY_NETWORK {
        return Ok(LOCALHOST_URL.to_string());
    }

    anyhow::bail!(
        "network \"{}\" is not configured. Please add it to the {} file",
        network,
        CONFIG_FILE
    )
}

fn env_number(name: &str) -> anyhow::Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{} must be a number", name)),
        Err(_) => Ok(None),
    }
}
