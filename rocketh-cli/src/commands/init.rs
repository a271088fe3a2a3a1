//! Init command handlers
//!
//! Generates editor support for deploy scripts: a `.luarc.json` for the Lua
//! Language Server and stub files describing the sandbox globals.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use rocketh_core::domain::log::LogLevel;
use rocketh_lua::{LogModule, LogSink, ModuleRegistry, core_stubs};
use std::fs;
use std::path::Path;

/// Init subcommands
#[derive(Subcommand)]
pub enum InitCommands {
    /// Generate Lua development files (.luarc.json and stubs)
    Lua {
        /// Output directory for generated files
        #[arg(short, long, default_value = ".")]
        output: String,

        /// Generate only .luarc.json
        #[arg(long)]
        config_only: bool,

        /// Generate only stub files
        #[arg(long)]
        stubs_only: bool,
    },
}

pub fn handle_init_command(command: InitCommands) -> Result<()> {
    match command {
        InitCommands::Lua {
            output,
            config_only,
            stubs_only,
        } => generate_lua_dev_files(Path::new(&output), config_only, stubs_only),
    }
}

fn generate_lua_dev_files(output: &Path, config_only: bool, stubs_only: bool) -> Result<()> {
    if !stubs_only {
        generate_luarc_json(output)?;
    }

    if !config_only {
        generate_stub_files(output)?;
    }

    println!("{}", "✓ Lua development files generated!".green().bold());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Install Lua Language Server in your editor");
    println!("  2. Put shared settings in deploy/_context.lua");
    println!("  3. Use {} to check the run order", "rocketh list".cyan());

    Ok(())
}

fn generate_luarc_json(output: &Path) -> Result<()> {
    let luarc_path = output.join(".luarc.json");

    let luarc_content = r#"{
  "$schema": "https://raw.githubusercontent.com/sumneko/vscode-lua/master/setting/schema.json",
  "runtime": {
    "version": "Lua 5.4"
  },
  "diagnostics": {
    "globals": ["log", "import", "deploy_script"]
  },
  "workspace": {
    "library": [".rocketh/stubs"],
    "checkThirdParty": false
  },
  "completion": {
    "callSnippet": "Both"
  }
}
"#;

    fs::write(&luarc_path, luarc_content)
        .with_context(|| format!("Failed to write .luarc.json to {:?}", luarc_path))?;

    println!("  {} .luarc.json", "Created".green());
    Ok(())
}

/// Writes one stub file for the sandbox core and one per module
///
/// Module stubs come from the module implementations themselves.
fn generate_stub_files(output: &Path) -> Result<()> {
    let stubs_dir = output.join(".rocketh").join("stubs");
    fs::create_dir_all(&stubs_dir)
        .with_context(|| format!("Failed to create stubs directory at {:?}", stubs_dir))?;

    let mut modules = ModuleRegistry::new();
    modules.register(LogModule::new(NoOpLogSink));

    let mut stubs = vec![("rocketh.lua".to_string(), core_stubs().to_string())];
    stubs.extend(modules.stub_files());

    for (file, content) in stubs {
        let stub_path = stubs_dir.join(&file);
        fs::write(&stub_path, content)
            .with_context(|| format!("Failed to write stub file {:?}", stub_path))?;
        println!("  {} {}", "Created".green(), file);
    }

    println!(
        "  {} in {}",
        "Stubs ready".green(),
        stubs_dir.display().to_string().cyan()
    );
    Ok(())
}

/// Sink for a log module that only serves stub generation
struct NoOpLogSink;

impl LogSink for NoOpLogSink {
    fn write(&mut self, _level: LogLevel, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_config_and_stubs() {
        let dir = tempfile::tempdir().unwrap();
        generate_lua_dev_files(dir.path(), false, false).unwrap();

        assert!(dir.path().join(".luarc.json").is_file());
        let stubs = dir.path().join(".rocketh").join("stubs");
        let core = fs::read_to_string(stubs.join("rocketh.lua")).unwrap();
        assert!(core.contains("function deploy_script"));
        let log = fs::read_to_string(stubs.join("log.lua")).unwrap();
        assert!(log.contains("function log.info"));
    }

    #[test]
    fn test_config_only() {
        let dir = tempfile::tempdir().unwrap();
        generate_lua_dev_files(dir.path(), true, false).unwrap();

        assert!(dir.path().join(".luarc.json").is_file());
        assert!(!dir.path().join(".rocketh").exists());
    }
}
