//! Reading the shared context table of the scripts

use mlua::{Lua, LuaSerdeExt, Table, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::environment::{ArtifactSource, ProvidedContext};
use crate::error::{ExecutorError, Result};

/// Extracts accounts and artifacts from the context table
///
/// Both fields are optional. `artifacts` is either a table of artifacts
/// keyed by name or the path of a directory of `<Name>.json` files.
pub fn provided_context(lua: &Lua, context: &Table) -> Result<ProvidedContext> {
    let invalid = |field: &str, e: mlua::Error| {
        ExecutorError::environment(format!("invalid '{}' in context: {}", field, e))
    };

    let accounts = match context.get::<Value>("accounts").map_err(|e| invalid("accounts", e))? {
        Value::Nil => BTreeMap::new(),
        value => lua.from_value(value).map_err(|e| invalid("accounts", e))?,
    };

    let artifacts = match context
        .get::<Value>("artifacts")
        .map_err(|e| invalid("artifacts", e))?
    {
        Value::Nil => ArtifactSource::default(),
        Value::String(dir) => ArtifactSource::Directory(PathBuf::from(dir.to_string_lossy())),
        value @ Value::Table(_) => {
            ArtifactSource::Inline(lua.from_value(value).map_err(|e| invalid("artifacts", e))?)
        }
        other => {
            return Err(ExecutorError::environment(format!(
                "invalid 'artifacts' in context: expected a table or a path, got {}",
                other.type_name()
            )));
        }
    };

    Ok(ProvidedContext {
        accounts,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NamedAccount;

    fn context(lua: &Lua, source: &str) -> Result<ProvidedContext> {
        let table: Table = lua.load(source).eval().unwrap();
        provided_context(lua, &table)
    }

    #[test]
    fn test_accounts_and_inline_artifacts() {
        let lua = Lua::new();
        let ctx = context(
            &lua,
            r#"return {
                accounts = { deployer = 0, admin = { default = 1, sepolia = "0xdddd" } },
                artifacts = { Token = { abi = {}, bytecode = "0x6080" } },
            }"#,
        )
        .unwrap();

        assert_eq!(ctx.accounts["deployer"], NamedAccount::Index(0));
        assert!(matches!(ctx.accounts["admin"], NamedAccount::PerNetwork(_)));
        assert_eq!(ctx.artifacts.get("Token").unwrap().bytecode, "0x6080");
    }

    #[test]
    fn test_artifact_directory() {
        let lua = Lua::new();
        let ctx = context(&lua, r#"return { artifacts = "out/artifacts" }"#).unwrap();
        assert!(
            matches!(ctx.artifacts, ArtifactSource::Directory(ref dir) if dir == &PathBuf::from("out/artifacts"))
        );
    }

    #[test]
    fn test_empty_context() {
        let lua = Lua::new();
        let ctx = context(&lua, "return {}").unwrap();
        assert!(ctx.accounts.is_empty());
    }

    #[test]
    fn test_invalid_fields() {
        let lua = Lua::new();
        assert!(context(&lua, "return { artifacts = 42 }").is_err());
        assert!(context(&lua, "return { accounts = { deployer = true } }").is_err());
    }
}
