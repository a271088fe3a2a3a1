//! Deployment store
//!
//! Persists deployment records per network under
//! `<deployments>/<network>/<name>.json`, next to two bookkeeping files:
//! - `.chain`: chain id the folder belongs to
//! - `.migrations.json`: ids of scripts that asked not to run again
//!
//! Writes go through a temporary file and a rename, so a crash never leaves a
//! truncated record behind. The in-memory variant keeps everything in the
//! process and is used for the `memory` network.

use chrono::Utc;
use rocketh_core::domain::deployment::{Deployment, DeploymentRecord, PendingDeployment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ExecutorError, Result};

const CHAIN_FILE: &str = ".chain";
const MIGRATIONS_FILE: &str = ".migrations.json";

#[derive(Debug, Default)]
pub struct DeploymentStore {
    /// Network folder; `None` when nothing is written to disk
    folder: Option<PathBuf>,
    records: BTreeMap<String, DeploymentRecord>,
    migrations: BTreeMap<String, i64>,
}

impl DeploymentStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the folder of `network` under `root`, loading existing records
    ///
    /// The folder is created on first write, not here.
    pub fn open(root: &Path, network: &str) -> Result<Self> {
        let folder = root.join(network);
        let mut store = Self {
            folder: Some(folder.clone()),
            ..Self::default()
        };

        if !folder.is_dir() {
            return Ok(store);
        }

        let entries = std::fs::read_dir(&folder).map_err(|source| ExecutorError::Store {
            path: folder.clone(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| ExecutorError::Store {
                    path: folder.clone(),
                    source,
                })?
                .path();

            let Some(name) = record_name(&path) else {
                continue;
            };
            let record: DeploymentRecord = read_json(&path)?;
            store.records.insert(name, record);
        }

        let migrations = folder.join(MIGRATIONS_FILE);
        if migrations.is_file() {
            store.migrations = read_json(&migrations)?;
        }

        debug!(
            "loaded {} deployment records from {}",
            store.records.len(),
            folder.display()
        );
        Ok(store)
    }

    /// Finalized deployment stored under `name`
    ///
    /// Pending records are never returned.
    pub fn get(&self, name: &str) -> Option<Deployment> {
        self.records.get(name).and_then(DeploymentRecord::deployment)
    }

    /// Raw record, pending or not
    pub fn record(&self, name: &str) -> Option<&DeploymentRecord> {
        self.records.get(name)
    }

    /// Finalized deployments, by name
    pub fn deployments(&self) -> BTreeMap<String, Deployment> {
        self.records
            .iter()
            .filter_map(|(name, record)| Some((name.clone(), record.deployment()?)))
            .collect()
    }

    /// Pending deployments, by name
    pub fn pending(&self) -> Vec<(String, PendingDeployment)> {
        self.records
            .iter()
            .filter_map(|(name, record)| Some((name.clone(), record.pending_deployment()?)))
            .collect()
    }

    pub fn save(&mut self, name: &str, deployment: Deployment) -> Result<()> {
        self.write_record(name, deployment.into())
    }

    pub fn save_pending(&mut self, name: &str, pending: PendingDeployment) -> Result<()> {
        self.write_record(name, pending.into())
    }

    /// Deletes the record of `name`, if any
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if self.records.remove(name).is_none() {
            return Ok(());
        }
        if let Some(folder) = &self.folder {
            let path = folder.join(format!("{}.json", name));
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(ExecutorError::Store { path, source }),
            }
        }
        Ok(())
    }

    pub fn has_migration(&self, id: &str) -> bool {
        self.migrations.contains_key(id)
    }

    /// Records that the script `id` completed and must not run again
    pub fn record_migration(&mut self, id: &str) -> Result<()> {
        let mut migrations = self.migrations.clone();
        migrations.insert(id.to_string(), Utc::now().timestamp());
        if let Some(folder) = &self.folder {
            write_json(&folder.join(MIGRATIONS_FILE), &migrations)?;
        }
        self.migrations = migrations;
        Ok(())
    }

    /// Binds the folder to `chain_id`
    ///
    /// The first call writes the `.chain` marker; later runs must target the
    /// same chain.
    ///
    /// # Errors
    /// Returns [`ExecutorError::ChainMismatch`] when the folder belongs to
    /// another chain.
    pub fn check_chain(&self, network: &str, chain_id: &str) -> Result<()> {
        let Some(folder) = &self.folder else {
            return Ok(());
        };

        let path = folder.join(CHAIN_FILE);
        match std::fs::read_to_string(&path) {
            Ok(expected) => {
                let expected = expected.trim();
                if !same_chain(expected, chain_id) {
                    return Err(ExecutorError::ChainMismatch {
                        network: network.to_string(),
                        expected: expected.to_string(),
                        actual: chain_id.to_string(),
                    });
                }
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("binding {} to chain {}", folder.display(), chain_id);
                write_atomic(&path, chain_id.as_bytes())
            }
            Err(source) => Err(ExecutorError::Store { path, source }),
        }
    }

    fn write_record(&mut self, name: &str, record: DeploymentRecord) -> Result<()> {
        validate_name(name)?;
        if let Some(folder) = &self.folder {
            write_json(&folder.join(format!("{}.json", name)), &record)?;
        }
        self.records.insert(name.to_string(), record);
        Ok(())
    }
}

/// Deployment name of a record file, `None` for anything else
fn record_name(path: &Path) -> Option<String> {
    if !path.is_file() || path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    Some(stem.to_string())
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(ExecutorError::environment(format!(
            "invalid deployment name '{}'",
            name
        )));
    }
    Ok(())
}

/// Compares chain ids, accepting hex and decimal spellings
fn same_chain(a: &str, b: &str) -> bool {
    fn parse(id: &str) -> Option<u64> {
        match id.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => id.parse().ok(),
        }
    }
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| ExecutorError::Store {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ExecutorError::Record {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value).map_err(|source| ExecutorError::Record {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &content)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let store_err = |source| ExecutorError::Store {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(store_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, content).map_err(store_err)?;
    std::fs::rename(&tmp, path).map_err(store_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocketh_core::domain::deployment::{PartialDeployment, ReceiptInfo, TransactionInfo};

    fn pending(hash: &str) -> PendingDeployment {
        PendingDeployment {
            partial_deployment: PartialDeployment {
                abi: serde_json::json!([]),
                bytecode: "0x6080".to_string(),
                args_data: String::new(),
            },
            transaction: TransactionInfo {
                hash: hash.to_string(),
                origin: "0x1111".to_string(),
                nonce: None,
            },
        }
    }

    fn deployment(hash: &str) -> Deployment {
        pending(hash).promote(
            "0x2222".to_string(),
            ReceiptInfo {
                block_number: 1,
                block_hash: "0xb1".to_string(),
                gas_used: 21000,
            },
        )
    }

    #[test]
    fn test_pending_is_hidden_from_get() {
        let mut store = DeploymentStore::in_memory();
        store.save_pending("Token", pending("0xa")).unwrap();

        assert!(store.get("Token").is_none());
        assert!(store.record("Token").unwrap().pending);
        assert_eq!(store.pending().len(), 1);

        store.save("Token", deployment("0xa")).unwrap();
        assert_eq!(store.get("Token").unwrap().address, "0x2222");
        assert!(store.pending().is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = DeploymentStore::open(dir.path(), "localhost").unwrap();
        store.save("Token", deployment("0xa")).unwrap();
        store.save_pending("Pool", pending("0xb")).unwrap();
        store.record_migration("init").unwrap();

        let folder = dir.path().join("localhost");
        assert!(folder.join("Token.json").is_file());
        assert!(folder.join("Pool.json").is_file());
        assert!(!folder.join("Token.json.tmp").exists());

        let store = DeploymentStore::open(dir.path(), "localhost").unwrap();
        assert_eq!(store.get("Token"), Some(deployment("0xa")));
        assert!(store.get("Pool").is_none());
        assert_eq!(store.pending()[0].0, "Pool");
        assert!(store.has_migration("init"));
        assert!(!store.has_migration(".migrations"));
        assert!(store.record(".migrations").is_none());
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DeploymentStore::open(dir.path(), "localhost").unwrap();
        store.save_pending("Token", pending("0xa")).unwrap();
        store.remove("Token").unwrap();

        assert!(store.record("Token").is_none());
        assert!(!dir.path().join("localhost").join("Token.json").exists());
        store.remove("Token").unwrap();
    }

    #[test]
    fn test_memory_store() {
        let mut store = DeploymentStore::in_memory();
        store.save("Token", deployment("0xa")).unwrap();
        store.record_migration("init").unwrap();
        store.check_chain("memory", "0x1").unwrap();
        store.check_chain("memory", "0x2").unwrap();

        assert!(store.has_migration("init"));
        assert_eq!(store.deployments().len(), 1);
    }

    #[test]
    fn test_failed_migration_write_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DeploymentStore::open(dir.path(), "localhost").unwrap();
        store.record_migration("first").unwrap();

        // a directory in place of the ledger makes the rename fail
        let ledger = dir.path().join("localhost").join(MIGRATIONS_FILE);
        std::fs::remove_file(&ledger).unwrap();
        std::fs::create_dir(&ledger).unwrap();

        let err = store.record_migration("second").unwrap_err();
        assert!(matches!(err, ExecutorError::Store { .. }));
        assert!(store.has_migration("first"));
        assert!(!store.has_migration("second"));
    }

    #[test]
    fn test_chain_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeploymentStore::open(dir.path(), "localhost").unwrap();

        store.check_chain("localhost", "0x7a69").unwrap();
        store.check_chain("localhost", "31337").unwrap();

        let err = store.check_chain("localhost", "0x1").unwrap_err();
        assert!(matches!(err, ExecutorError::ChainMismatch { .. }));
    }

    #[test]
    fn test_invalid_names() {
        let mut store = DeploymentStore::in_memory();
        assert!(store.save("", deployment("0xa")).is_err());
        assert!(store.save("../Token", deployment("0xa")).is_err());
        assert!(store.save(".chain", deployment("0xa")).is_err());
    }

    #[test]
    fn test_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("localhost");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("Token.json"), "{").unwrap();

        let err = DeploymentStore::open(dir.path(), "localhost").unwrap_err();
        assert!(matches!(err, ExecutorError::Record { .. }));
    }
}
