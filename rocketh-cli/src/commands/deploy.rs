//! Deploy command handler

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use rocketh_executor::{Config, execute_deploy_scripts};
use rocketh_rpc::JsonRpcClient;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::RunOptions;
use crate::output::{CliObserver, print_summary};

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub run: RunOptions,

    /// Arguments passed to every script, as key=value pairs (e.g., -a supply=1000)
    #[arg(short, long = "arg", value_parser = parse_key_val)]
    pub args: Vec<(String, String)>,

    /// JSON file with arguments passed to every script; -a pairs override its keys
    #[arg(long)]
    pub args_file: Option<String>,
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Builds the `args` value handed to scripts
///
/// `None` when no argument was given, so scripts see `nil`.
fn script_args(pairs: &[(String, String)], file: Option<&str>) -> Result<Option<Value>> {
    let mut args = match file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read args file {}", path))?;
            match serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in args file {}", path))?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("args file {} must contain a JSON object", path),
            }
        }
        None if pairs.is_empty() => return Ok(None),
        None => Map::new(),
    };

    for (key, value) in pairs {
        args.insert(key.clone(), Value::String(value.clone()));
    }
    Ok(Some(Value::Object(args)))
}

pub async fn handle_deploy_command(args: DeployArgs) -> Result<()> {
    let config = Config::from_options(&args.run.config_options(), false)?;
    config.validate()?;
    let script_args = script_args(&args.args, args.args_file.as_deref())?;

    println!(
        "{} {} ({})",
        "Deploying to".bold(),
        config.network_name.cyan(),
        config.node_url
    );

    let provider = Arc::new(JsonRpcClient::new(config.node_url.clone()));
    let summary = execute_deploy_scripts(
        &config,
        provider,
        script_args.as_ref(),
        Arc::new(CliObserver),
    )
    .await
    .context("Deployment failed")?;

    print_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("supply=1000").unwrap(),
            ("supply".to_string(), "1000".to_string())
        );
        assert_eq!(
            parse_key_val("url=http://a?b=c").unwrap(),
            ("url".to_string(), "http://a?b=c".to_string())
        );
        assert!(parse_key_val("nope").is_err());
    }

    #[test]
    fn test_script_args() {
        assert!(script_args(&[], None).unwrap().is_none());

        let pairs = vec![("supply".to_string(), "1000".to_string())];
        let args = script_args(&pairs, None).unwrap().unwrap();
        assert_eq!(args["supply"], "1000");
    }

    #[test]
    fn test_args_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.json");
        std::fs::write(&path, r#"{ "supply": 5, "name": "Token" }"#).unwrap();

        let pairs = vec![("name".to_string(), "Other".to_string())];
        let args = script_args(&pairs, path.to_str()).unwrap().unwrap();
        assert_eq!(args["supply"], 5);
        assert_eq!(args["name"], "Other");

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(script_args(&[], path.to_str()).is_err());
    }
}
