//! Execution environment
//!
//! What scripts act on: the target network, named accounts, artifacts and
//! the deployment store. One environment is created per run and shared by
//! every script of that run (scripts see it as `env`).
//!
//! The store sits behind a mutex that is only held for synchronous store
//! operations, never across a network call.

pub mod accounts;
pub mod artifacts;
pub mod recovery;

pub use accounts::{NamedAccount, resolve_accounts};
pub use artifacts::ArtifactSource;
pub use recovery::RecoveryReport;

use rocketh_core::domain::artifact::Artifact;
use rocketh_core::domain::deployment::{
    Deployment, PartialDeployment, PendingDeployment, TransactionInfo,
};
use rocketh_core::hex::concat_data;
use rocketh_rpc::{Provider, RpcError, TransactionReceipt, TransactionRequest};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ExecutorError, FailureReason, Result};
use crate::store::DeploymentStore;

/// Settings taken from the shared context of the scripts
#[derive(Debug, Clone, Default)]
pub struct ProvidedContext {
    pub accounts: BTreeMap<String, NamedAccount>,
    pub artifacts: ArtifactSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub name: String,
    /// Chain id as reported by the node
    pub chain_id: String,
}

/// Options of `env.deploy`
///
/// Keys follow the deployment records (`argsData`); unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeployOptions {
    /// Account name or literal address
    pub account: String,
    pub artifact: String,
    #[serde(default)]
    pub args_data: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas: Option<String>,
}

/// Options of `env.execute`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecuteOptions {
    pub account: String,
    pub data: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas: Option<String>,
}

/// State of a transaction after waiting for it
#[derive(Debug, Clone)]
pub(crate) enum TransactionOutcome {
    Mined(TransactionReceipt),
    Failed(FailureReason),
    /// Still unknown when the wait timed out
    Pending,
}

pub struct Environment {
    network: NetworkInfo,
    provider: Arc<dyn Provider>,
    accounts: BTreeMap<String, String>,
    artifacts: ArtifactSource,
    store: Mutex<DeploymentStore>,
    poll_interval: Duration,
    recovery_timeout: Option<Duration>,
}

impl Environment {
    /// Connects to the network and opens its deployment store
    ///
    /// # Errors
    /// Fails when the node cannot be reached, when the store cannot be read,
    /// or with [`ExecutorError::ChainMismatch`] when the store belongs to
    /// another chain.
    pub async fn create(
        config: &Config,
        provider: Arc<dyn Provider>,
        context: ProvidedContext,
    ) -> Result<Self> {
        let chain_id = provider.chain_id().await?;

        let node_accounts = if context
            .accounts
            .values()
            .any(NamedAccount::needs_node_accounts)
        {
            provider.accounts().await?
        } else {
            Vec::new()
        };
        let accounts = resolve_accounts(&context.accounts, &config.network_name, &node_accounts);

        let store = if config.is_memory_network() {
            DeploymentStore::in_memory()
        } else {
            DeploymentStore::open(&config.deployments, &config.network_name)?
        };
        store.check_chain(&config.network_name, &chain_id)?;

        info!(
            "environment ready: network {} (chain {}), {} named accounts",
            config.network_name,
            chain_id,
            accounts.len()
        );

        Ok(Self {
            network: NetworkInfo {
                name: config.network_name.clone(),
                chain_id,
            },
            provider,
            accounts,
            artifacts: context.artifacts,
            store: Mutex::new(store),
            poll_interval: config.poll_interval,
            recovery_timeout: config.recovery_timeout,
        })
    }

    pub fn network(&self) -> &NetworkInfo {
        &self.network
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Named accounts resolved to addresses
    pub fn accounts(&self) -> &BTreeMap<String, String> {
        &self.accounts
    }

    pub fn artifact(&self, name: &str) -> Result<Artifact> {
        self.artifacts.get(name)
    }

    /// Finalized deployment stored under `name`
    pub fn get(&self, name: &str) -> Result<Option<Deployment>> {
        Ok(self.store()?.get(name))
    }

    /// All finalized deployments
    pub fn deployments(&self) -> Result<BTreeMap<String, Deployment>> {
        Ok(self.store()?.deployments())
    }

    pub fn save(&self, name: &str, deployment: Deployment) -> Result<()> {
        self.store()?.save(name, deployment)?;
        info!("saved deployment '{}'", name);
        Ok(())
    }

    /// Persists `pending`, waits for its transaction and saves the result
    ///
    /// The pending record is on disk before the first receipt query, so an
    /// interrupted run is picked up by recovery on the next one.
    ///
    /// # Errors
    /// Returns [`ExecutorError::TransactionFailed`] when the transaction
    /// reverts or is dropped; the pending record is removed then.
    pub async fn save_while_pending(
        &self,
        name: &str,
        pending: PendingDeployment,
    ) -> Result<Deployment> {
        let tx_hash = pending.transaction.hash.clone();
        self.ensure_no_outstanding(name, Some(&tx_hash))?;
        self.store()?.save_pending(name, pending.clone())?;
        info!("waiting for deployment '{}' ({})", name, tx_hash);

        let outcome = self.wait_for_transaction(&tx_hash, None).await?;
        let result = match outcome {
            TransactionOutcome::Mined(receipt) => finalize(pending, &receipt),
            TransactionOutcome::Failed(reason) => Err(reason),
            TransactionOutcome::Pending => {
                return Err(ExecutorError::environment(format!(
                    "transaction {} of '{}' is still pending",
                    tx_hash, name
                )));
            }
        };

        match result {
            Ok(deployment) => {
                self.store()?.save(name, deployment.clone())?;
                info!("deployed '{}' at {}", name, deployment.address);
                Ok(deployment)
            }
            Err(reason) => {
                self.store()?.remove(name)?;
                Err(ExecutorError::TransactionFailed {
                    name: name.to_string(),
                    tx_hash,
                    reason,
                })
            }
        }
    }

    /// Deploys an artifact under `name` and waits for it to be mined
    pub async fn deploy(&self, name: &str, options: DeployOptions) -> Result<Deployment> {
        self.ensure_no_outstanding(name, None)?;
        let from = self.resolve_account(&options.account)?;
        let artifact = self.artifact(&options.artifact)?;
        let args_data = options.args_data.unwrap_or_default();

        let request = TransactionRequest {
            from: from.clone(),
            data: concat_data(&artifact.bytecode, &args_data),
            value: options.value,
            gas: options.gas,
            ..Default::default()
        };
        debug!("deploying '{}' ({}) from {}", name, options.artifact, from);
        let hash = self.provider.send_transaction(&request).await?;

        let pending = PendingDeployment {
            partial_deployment: PartialDeployment {
                abi: artifact.abi,
                bytecode: artifact.bytecode,
                args_data,
            },
            transaction: TransactionInfo {
                hash,
                origin: from,
                nonce: None,
            },
        };
        self.save_while_pending(name, pending).await
    }

    /// Sends a transaction to the deployment `name` and waits for it
    ///
    /// Returns the transaction hash.
    pub async fn execute(&self, name: &str, options: ExecuteOptions) -> Result<String> {
        let target = self
            .get(name)?
            .ok_or_else(|| ExecutorError::environment(format!("no deployment named '{}'", name)))?;
        let from = self.resolve_account(&options.account)?;

        let request = TransactionRequest {
            from,
            to: Some(target.address),
            data: options.data,
            value: options.value,
            gas: options.gas,
            ..Default::default()
        };
        let hash = self.provider.send_transaction(&request).await?;
        debug!("executing on '{}': {}", name, hash);

        match self.wait_for_transaction(&hash, None).await? {
            TransactionOutcome::Mined(receipt) if receipt.is_success() => Ok(hash),
            TransactionOutcome::Mined(_) => Err(ExecutorError::TransactionFailed {
                name: name.to_string(),
                tx_hash: hash,
                reason: FailureReason::Reverted,
            }),
            TransactionOutcome::Failed(reason) => Err(ExecutorError::TransactionFailed {
                name: name.to_string(),
                tx_hash: hash,
                reason,
            }),
            TransactionOutcome::Pending => Err(ExecutorError::environment(format!(
                "transaction {} is still pending",
                hash
            ))),
        }
    }

    /// Resolves an account name, or passes a literal address through
    pub fn resolve_account(&self, account: &str) -> Result<String> {
        if account.starts_with("0x") {
            return Ok(account.to_string());
        }
        self.accounts
            .get(account)
            .cloned()
            .ok_or_else(|| ExecutorError::environment(format!("no address for account '{}'", account)))
    }

    pub fn has_migration(&self, id: &str) -> Result<bool> {
        Ok(self.store()?.has_migration(id))
    }

    pub fn record_migration(&self, id: &str) -> Result<()> {
        self.store()?.record_migration(id)
    }

    /// Polls the node until the transaction is mined, dropped, or `timeout`
    /// elapses (never, when `None`)
    ///
    /// A mined transaction that reverted is reported as
    /// `Failed(Reverted)`.
    pub(crate) async fn wait_for_transaction(
        &self,
        hash: &str,
        timeout: Option<Duration>,
    ) -> std::result::Result<TransactionOutcome, RpcError> {
        let started = Instant::now();
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(hash).await? {
                if receipt.is_success() {
                    return Ok(TransactionOutcome::Mined(receipt));
                }
                return Ok(TransactionOutcome::Failed(FailureReason::Reverted));
            }

            if self.provider.get_transaction_by_hash(hash).await?.is_none() {
                return Ok(TransactionOutcome::Failed(FailureReason::Dropped));
            }

            if timeout.is_some_and(|t| started.elapsed() >= t) {
                return Ok(TransactionOutcome::Pending);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub(crate) fn recovery_timeout(&self) -> Option<Duration> {
        self.recovery_timeout
    }

    pub(crate) fn store(&self) -> Result<MutexGuard<'_, DeploymentStore>> {
        self.store
            .lock()
            .map_err(|e| ExecutorError::environment(format!("deployment store lock poisoned: {}", e)))
    }

    /// Refuses to start a deployment over an outstanding pending one
    fn ensure_no_outstanding(&self, name: &str, tx_hash: Option<&str>) -> Result<()> {
        let outstanding = self
            .store()?
            .record(name)
            .filter(|r| r.pending)
            .map(|r| r.transaction.hash.clone());

        match outstanding {
            Some(existing) if tx_hash != Some(existing.as_str()) => {
                warn!("'{}' still has pending transaction {}", name, existing);
                Err(ExecutorError::environment(format!(
                    "deployment '{}' has an outstanding transaction {}",
                    name, existing
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Turns a mined deployment transaction into the final deployment
fn finalize(
    pending: PendingDeployment,
    receipt: &TransactionReceipt,
) -> std::result::Result<Deployment, FailureReason> {
    let address = receipt
        .contract_address
        .clone()
        .ok_or(FailureReason::NoContractAddress)?;
    Ok(pending.promote(address, receipt.info()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockProvider, config_in, token_context};

    async fn environment(provider: Arc<MockProvider>, dir: &std::path::Path) -> Environment {
        Environment::create(&config_in(dir), provider, token_context())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_resolves_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let env = environment(Arc::new(MockProvider::new()), dir.path()).await;

        assert_eq!(env.network().chain_id, "0x7a69");
        assert_eq!(env.accounts()["deployer"], MockProvider::ACCOUNTS[0]);
        assert!(dir.path().join("localhost").join(".chain").is_file());
    }

    #[tokio::test]
    async fn test_deploy_persists_deployment() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let env = environment(provider.clone(), dir.path()).await;

        let deployment = env
            .deploy(
                "Token",
                DeployOptions {
                    account: "deployer".to_string(),
                    artifact: "Token".to_string(),
                    args_data: Some("0x0001".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(env.get("Token").unwrap(), Some(deployment.clone()));
        assert_eq!(deployment.args_data, "0x0001");
        assert!(dir.path().join("localhost").join("Token.json").is_file());

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["data"], "0x60800001");
        assert_eq!(sent[0]["from"], MockProvider::ACCOUNTS[0]);
    }

    #[tokio::test]
    async fn test_reverted_deployment_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new().reverting());
        let env = environment(provider, dir.path()).await;

        let err = env
            .deploy(
                "Token",
                DeployOptions {
                    account: "deployer".to_string(),
                    artifact: "Token".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExecutorError::TransactionFailed {
                reason: FailureReason::Reverted,
                ..
            }
        ));
        assert!(env.store().unwrap().record("Token").is_none());
    }

    #[tokio::test]
    async fn test_execute_targets_deployment() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());
        let env = environment(provider.clone(), dir.path()).await;

        let err = env
            .execute(
                "Token",
                ExecuteOptions {
                    account: "deployer".to_string(),
                    data: "0x1234".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no deployment named 'Token'"));

        let token = env
            .deploy(
                "Token",
                DeployOptions {
                    account: "deployer".to_string(),
                    artifact: "Token".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        env.execute(
            "Token",
            ExecuteOptions {
                account: "deployer".to_string(),
                data: "0x1234".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let sent = provider.sent();
        assert_eq!(sent[1]["to"], token.address);
        assert_eq!(sent[1]["data"], "0x1234");
    }

    #[tokio::test]
    async fn test_outstanding_pending_blocks_redeploy() {
        let dir = tempfile::tempdir().unwrap();
        let env = environment(Arc::new(MockProvider::new()), dir.path()).await;
        env.store()
            .unwrap()
            .save_pending("Token", crate::testing::pending_token("0xdead"))
            .unwrap();

        let err = env
            .deploy(
                "Token",
                DeployOptions {
                    account: "deployer".to_string(),
                    artifact: "Token".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("outstanding transaction 0xdead"));
    }

    #[test]
    fn test_receipt_without_contract_address() {
        let receipt = TransactionReceipt {
            transaction_hash: "0xa".to_string(),
            block_number: "0x1".to_string(),
            block_hash: "0xb".to_string(),
            contract_address: None,
            status: Some("0x1".to_string()),
            gas_used: None,
        };
        let result = finalize(crate::testing::pending_token("0xa"), &receipt);
        assert_eq!(result.unwrap_err(), FailureReason::NoContractAddress);
    }
}
