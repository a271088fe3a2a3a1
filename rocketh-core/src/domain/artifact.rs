//! Artifact domain types

use serde::{Deserialize, Serialize};

/// Compiled contract artifact
///
/// Only the fields the deployer needs are kept; anything else present in the
/// JSON emitted by the compiler toolchain is ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub abi: serde_json::Value,
    pub bytecode: String,
}
