//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;
mod init;
mod list;

pub use deploy::DeployArgs;
pub use init::InitCommands;
pub use list::ListArgs;

use anyhow::Result;
use clap::{Args, Subcommand};
use rocketh_executor::ConfigOptions;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run deploy scripts
    Deploy(DeployArgs),
    /// Show the scripts a deploy would run, in order, without running them
    List(ListArgs),
    /// Initialize development environment
    Init {
        #[command(subcommand)]
        command: InitCommands,
    },
}

/// Options shared by commands that load deploy scripts
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Network to deploy to (`memory` keeps deployments in memory only)
    #[arg(short, long, env = "ROCKETH_NETWORK", default_value = "memory")]
    pub network: String,

    /// Directory containing the deploy scripts
    #[arg(short, long, env = "ROCKETH_SCRIPTS")]
    pub scripts: Option<String>,

    /// Root directory of deployment records
    #[arg(short, long, env = "ROCKETH_DEPLOYMENTS")]
    pub deployments: Option<String>,

    /// Only run scripts with these tags (comma-separated), plus their dependencies
    #[arg(short, long)]
    pub tags: Option<String>,
}

impl RunOptions {
    pub fn config_options(&self) -> ConfigOptions {
        ConfigOptions {
            network: self.network.clone(),
            deployments: self.deployments.clone(),
            scripts: self.scripts.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Deploy(args) => deploy::handle_deploy_command(args).await,
        Commands::List(args) => list::handle_list_command(args),
        Commands::Init { command } => init::handle_init_command(command),
    }
}
