//! Script metadata parser
//!
//! Extracts the scheduling metadata (tags, dependencies, run-at-the-end flag,
//! migration id) from an evaluated script table. The executable parts are
//! handled by [`crate::definition`].

use anyhow::{Context, Result};
use mlua::{Table, Value};
use rocketh_core::domain::script::ScriptMetadata;
use std::path::Path;

/// Parse scheduling metadata from a script table
///
/// # Arguments
/// * `path` - Absolute path of the script; becomes its identity
/// * `script` - The table the script file evaluated to
///
/// # Errors
/// Returns an error if a field has the wrong type:
/// - `tags` must be a string or an array of strings
/// - `dependencies` must be an array of strings
/// - `run_at_the_end` must be a boolean
/// - `id` must be a string
pub fn parse_script_metadata(path: &Path, script: &Table) -> Result<ScriptMetadata> {
    let tags = parse_tags(script)?;
    let dependencies = parse_dependencies(script)?;

    let run_at_the_end = match script.get::<Value>("run_at_the_end")? {
        Value::Nil => false,
        Value::Boolean(value) => value,
        _ => anyhow::bail!("Field 'run_at_the_end' must be a boolean"),
    };

    let id = match script.get::<Value>("id")? {
        Value::Nil => None,
        Value::String(s) => Some(s.to_str()?.to_string()),
        _ => anyhow::bail!("Field 'id' must be a string"),
    };

    let has_skip = match script.get::<Value>("skip")? {
        Value::Nil => false,
        Value::Function(_) => true,
        _ => anyhow::bail!("Field 'skip' must be a function"),
    };

    Ok(ScriptMetadata {
        path: path.to_path_buf(),
        tags,
        dependencies,
        run_at_the_end,
        id,
        has_skip,
    })
}

/// Parse the 'tags' field, normalizing a single string to a one-element list
fn parse_tags(script: &Table) -> Result<Vec<String>> {
    let tags = match script.get::<Value>("tags")? {
        Value::Nil => Vec::new(),
        Value::String(tag) => vec![tag.to_str()?.to_string()],
        Value::Table(table) => read_strings(&table).context("Failed to read tags entry")?,
        _ => anyhow::bail!("Field 'tags' must be a string or an array of strings"),
    };

    // Tags form a set; keep the first occurrence
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    Ok(unique)
}

/// Parse the 'dependencies' field
fn parse_dependencies(script: &Table) -> Result<Vec<String>> {
    match script.get::<Value>("dependencies")? {
        Value::Nil => Ok(Vec::new()),
        Value::Table(table) => read_strings(&table).context("Failed to read dependencies entry"),
        _ => anyhow::bail!("Field 'dependencies' must be an array of strings"),
    }
}

fn read_strings(table: &Table) -> Result<Vec<String>> {
    let mut values = Vec::new();
    for value in table.sequence_values::<String>() {
        values.push(value?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    fn parse(source: &str) -> Result<ScriptMetadata> {
        let lua = Lua::new();
        let table: Table = lua.load(source).eval()?;
        parse_script_metadata(Path::new("/deploy/01_token.lua"), &table)
    }

    #[test]
    fn test_parse_minimal_script() {
        let meta = parse("return { func = function() end }").unwrap();
        assert_eq!(meta.path, Path::new("/deploy/01_token.lua"));
        assert!(meta.tags.is_empty());
        assert!(meta.dependencies.is_empty());
        assert!(!meta.run_at_the_end);
        assert!(meta.id.is_none());
        assert!(!meta.has_skip);
    }

    #[test]
    fn test_parse_full_script() {
        let meta = parse(
            r#"
            return {
                func = function() end,
                tags = {"pool", "core", "pool"},
                dependencies = {"token", "registry"},
                run_at_the_end = true,
                id = "pool-v1",
                skip = function() return false end,
            }
        "#,
        )
        .unwrap();
        assert_eq!(meta.tags, vec!["pool", "core"]);
        assert_eq!(meta.dependencies, vec!["token", "registry"]);
        assert!(meta.run_at_the_end);
        assert_eq!(meta.id.as_deref(), Some("pool-v1"));
        assert!(meta.has_skip);
    }

    #[test]
    fn test_single_string_tag() {
        let meta = parse(r#"return { tags = "token" }"#).unwrap();
        assert_eq!(meta.tags, vec!["token"]);
    }

    #[test]
    fn test_comma_tags_are_kept_for_the_index_to_reject() {
        let meta = parse(r#"return { tags = "a,b" }"#).unwrap();
        assert_eq!(meta.tags, vec!["a,b"]);
    }

    #[test]
    fn test_invalid_field_types() {
        assert!(parse("return { tags = 12 }").is_err());
        assert!(parse("return { dependencies = 'token' }").is_err());
        assert!(parse("return { run_at_the_end = 'yes' }").is_err());
        assert!(parse("return { id = 3 }").is_err());
        assert!(parse("return { skip = true }").is_err());
        assert!(parse("return { tags = { {} } }").is_err());
    }
}
