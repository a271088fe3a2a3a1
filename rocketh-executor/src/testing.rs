//! Test doubles shared by the executor's unit tests

use async_trait::async_trait;
use rocketh_core::domain::artifact::Artifact;
use rocketh_core::domain::deployment::{PartialDeployment, PendingDeployment, TransactionInfo};
use rocketh_core::domain::script::ScriptMetadata;
use rocketh_rpc::{Provider, RpcError};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::environment::{ArtifactSource, NamedAccount, ProvidedContext};
use crate::error::ExecutorError;
use crate::observer::{RunObserver, SkipReason};

/// In-process node: transactions are mined as soon as they are sent
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
    failing: AtomicBool,
    reverting: bool,
}

#[derive(Default)]
struct MockState {
    receipts: HashMap<String, Value>,
    known: HashSet<String>,
    sent: Vec<Value>,
    calls: Vec<String>,
}

impl MockProvider {
    pub const CHAIN_ID: &'static str = "0x7a69";
    pub const ACCOUNTS: [&'static str; 2] = [
        "0x1111111111111111111111111111111111111111",
        "0x2222222222222222222222222222222222222222",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    /// Mines every sent transaction with a failed status
    pub fn reverting(mut self) -> Self {
        self.reverting = true;
        self
    }

    /// Registers a mined transaction
    pub fn with_mined(self, hash: &str, contract_address: Option<&str>, success: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.known.insert(hash.to_string());
            state
                .receipts
                .insert(hash.to_string(), receipt(hash, contract_address, success));
        }
        self
    }

    /// Registers a transaction the node knows but has not mined
    pub fn with_known(self, hash: &str) -> Self {
        self.state.lock().unwrap().known.insert(hash.to_string());
        self
    }

    /// Makes every request fail from now on
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Transactions received through `eth_sendTransaction`
    pub fn sent(&self) -> Vec<Value> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Methods called, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

fn receipt(hash: &str, contract_address: Option<&str>, success: bool) -> Value {
    json!({
        "transactionHash": hash,
        "blockNumber": "0x1",
        "blockHash": "0xb1",
        "contractAddress": contract_address,
        "status": if success { "0x1" } else { "0x0" },
        "gasUsed": "0x5208",
    })
}

#[async_trait]
impl Provider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> rocketh_rpc::Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method.to_string());

        if self.failing.load(Ordering::SeqCst) {
            return Err(RpcError::Rpc {
                method: method.to_string(),
                code: -32000,
                message: "node unavailable".to_string(),
            });
        }

        let hash = params[0].as_str().unwrap_or_default().to_string();
        match method {
            "eth_chainId" => Ok(json!(Self::CHAIN_ID)),
            "eth_accounts" => Ok(json!(Self::ACCOUNTS)),
            "eth_getTransactionReceipt" => {
                Ok(state.receipts.get(&hash).cloned().unwrap_or(Value::Null))
            }
            "eth_getTransactionByHash" => Ok(if state.known.contains(&hash) {
                json!({ "hash": hash, "from": Self::ACCOUNTS[0] })
            } else {
                Value::Null
            }),
            "eth_sendTransaction" => {
                let tx = params[0].clone();
                state.sent.push(tx.clone());
                let n = state.sent.len();
                let hash = format!("0x{:064x}", n);
                let contract_address = match tx.get("to") {
                    Some(_) => None,
                    None => Some(format!("0x{:040x}", 0xc0de_0000_u64 + n as u64)),
                };
                let receipt = receipt(&hash, contract_address.as_deref(), !self.reverting);
                state.known.insert(hash.clone());
                state.receipts.insert(hash.clone(), receipt);
                Ok(json!(hash))
            }
            other => Err(RpcError::Rpc {
                method: other.to_string(),
                code: -32601,
                message: "method not found".to_string(),
            }),
        }
    }
}

/// Localhost configuration storing deployments under `dir`
pub fn config_in(dir: &Path) -> Config {
    let mut config = Config::new("localhost", "http://127.0.0.1:8545");
    config.deployments = dir.to_path_buf();
    config.scripts = dir.join("deploy");
    config.poll_interval = Duration::from_millis(5);
    config
}

/// Context with a `deployer` account and `Token` / `Pool` artifacts
pub fn token_context() -> ProvidedContext {
    let mut accounts = BTreeMap::new();
    accounts.insert("deployer".to_string(), NamedAccount::Index(0));

    let mut artifacts = BTreeMap::new();
    for (name, bytecode) in [("Token", "0x6080"), ("Pool", "0x6081")] {
        artifacts.insert(
            name.to_string(),
            Artifact {
                abi: json!([]),
                bytecode: bytecode.to_string(),
            },
        );
    }

    ProvidedContext {
        accounts,
        artifacts: ArtifactSource::Inline(artifacts),
    }
}

pub fn pending_token(hash: &str) -> PendingDeployment {
    PendingDeployment {
        partial_deployment: PartialDeployment {
            abi: json!([]),
            bytecode: "0x6080".to_string(),
            args_data: String::new(),
        },
        transaction: TransactionInfo {
            hash: hash.to_string(),
            origin: MockProvider::ACCOUNTS[0].to_string(),
            nonce: None,
        },
    }
}

/// Observer recording lifecycle events as `event:file_name` strings
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: &str, script: &ScriptMetadata) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", event, script.file_name()));
    }
}

impl RunObserver for RecordingObserver {
    fn script_started(&self, script: &ScriptMetadata) {
        self.push("start", script);
    }

    fn script_skipped(&self, script: &ScriptMetadata, _reason: &SkipReason) {
        self.push("skip", script);
    }

    fn script_succeeded(&self, script: &ScriptMetadata) {
        self.push("success", script);
    }

    fn script_failed(&self, script: &ScriptMetadata, _error: &ExecutorError) {
        self.push("fail", script);
    }
}
