//! Script definition for runtime execution
//!
//! Unlike [`ScriptMetadata`] (which is plain data), a [`ScriptDefinition`]
//! holds the Lua functions of a script and is only valid inside the sandbox
//! it was evaluated in.

use anyhow::{Context, Result};
use mlua::{Function, Lua, Table, Value};
use rocketh_core::domain::script::ScriptMetadata;
use std::path::Path;
use tracing::warn;

use crate::parser::parse_script_metadata;

/// Full script definition with executable Lua functions
#[derive(Debug, Clone)]
pub struct ScriptDefinition {
    pub metadata: ScriptMetadata,
    /// Script body, called as `func(env, args)`
    pub func: Function,
    /// Optional predicate, called as `skip(env, args)`
    pub skip: Option<Function>,
    /// Shared context the script was written against
    pub provided_context: Option<Table>,
}

impl ScriptDefinition {
    /// Returns true if both scripts reference the same context table
    ///
    /// Contexts are compared by identity, not by content: two scripts built
    /// from separate but equal tables do not share a context.
    pub fn shares_context_with(&self, other: &ScriptDefinition) -> bool {
        match (&self.provided_context, &other.provided_context) {
            (Some(a), Some(b)) => a.to_pointer() == b.to_pointer(),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Evaluate a script file in the sandbox and extract its definition
///
/// The chunk must evaluate to a script table. A table nested under a
/// `default` field is unwrapped; a second level of nesting is unwrapped too,
/// with a warning.
///
/// # Arguments
/// * `lua` - The run's sandbox (see [`crate::create_sandbox`])
/// * `path` - Absolute path of the script, used as its identity and chunk name
/// * `source` - The Lua source code
///
/// # Errors
/// Returns an error if:
/// - The Lua source is invalid or raises while evaluating
/// - The chunk does not evaluate to a table
/// - `func` is missing or not a function
/// - A metadata field has the wrong type
pub fn parse_script_definition(lua: &Lua, path: &Path, source: &str) -> Result<ScriptDefinition> {
    let value: Value = lua
        .load(source)
        .set_name(format!("@{}", path.display()))
        .eval()
        .context("Failed to evaluate script")?;

    let script = unwrap_default(value, path)?;

    let metadata = parse_script_metadata(path, &script)?;

    let func: Function = match script.get::<Value>("func")? {
        Value::Function(func) => func,
        Value::Nil => anyhow::bail!("Script must have a 'func' function"),
        _ => anyhow::bail!("Field 'func' must be a function"),
    };

    let skip: Option<Function> = script.get("skip")?;

    let provided_context = match script.get::<Value>("provided_context")? {
        Value::Nil => None,
        Value::Table(table) => Some(table),
        _ => anyhow::bail!("Field 'provided_context' must be a table"),
    };

    Ok(ScriptDefinition {
        metadata,
        func,
        skip,
        provided_context,
    })
}

fn unwrap_default(value: Value, path: &Path) -> Result<Table> {
    let mut script = match value {
        Value::Table(table) => table,
        other => anyhow::bail!("Script must return a table, got {}", other.type_name()),
    };

    if let Value::Table(inner) = script.get::<Value>("default")? {
        script = inner;
        if let Value::Table(inner) = script.get::<Value>("default")? {
            warn!("double default in {}", path.display());
            script = inner;
        }
    }

    Ok(script)
}
