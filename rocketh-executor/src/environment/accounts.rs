//! Named accounts
//!
//! Scripts refer to accounts by name (`deployer`, `admin`); the context maps
//! each name to an index into the node's accounts, a literal address, or a
//! per-network table of either with an optional `default`.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NamedAccount {
    Index(usize),
    Address(String),
    PerNetwork(BTreeMap<String, NamedAccount>),
}

impl NamedAccount {
    /// Entry that applies on `network`
    fn for_network(&self, network: &str) -> Option<&NamedAccount> {
        match self {
            Self::PerNetwork(networks) => networks
                .get(network)
                .or_else(|| networks.get("default"))?
                .for_network(network),
            other => Some(other),
        }
    }

    /// True when resolving needs the node's account list
    pub fn needs_node_accounts(&self) -> bool {
        match self {
            Self::Index(_) => true,
            Self::Address(_) => false,
            Self::PerNetwork(networks) => networks.values().any(Self::needs_node_accounts),
        }
    }
}

/// Resolves named accounts to addresses for `network`
///
/// Names without a usable entry on the network are left out, so
/// `env.accounts.name` is nil for them.
pub fn resolve_accounts(
    named: &BTreeMap<String, NamedAccount>,
    network: &str,
    node_accounts: &[String],
) -> BTreeMap<String, String> {
    let mut accounts = BTreeMap::new();
    for (name, account) in named {
        let address = match account.for_network(network) {
            Some(NamedAccount::Index(index)) => match node_accounts.get(*index) {
                Some(address) => address.clone(),
                None => {
                    warn!(
                        "account '{}' uses index {} but the node only has {} accounts",
                        name,
                        index,
                        node_accounts.len()
                    );
                    continue;
                }
            },
            Some(NamedAccount::Address(address)) if address.starts_with("0x") => address.clone(),
            Some(NamedAccount::Address(address)) => {
                warn!("account '{}' is not an address: {}", name, address);
                continue;
            }
            Some(NamedAccount::PerNetwork(_)) | None => continue,
        };
        accounts.insert(name.clone(), address);
    }
    accounts
}
