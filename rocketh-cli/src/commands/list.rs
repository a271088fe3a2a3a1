//! List command handler
//!
//! Loads the scripts and prints the order a deploy would run them in. No
//! node is contacted.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use rocketh_executor::{Config, DeployPlan};

use super::RunOptions;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub run: RunOptions,

    /// Also list every known tag with the scripts carrying it
    #[arg(long)]
    pub show_tags: bool,
}

pub fn handle_list_command(args: ListArgs) -> Result<()> {
    let config = Config::from_options(&args.run.config_options(), true)?;
    config.validate()?;

    let plan = DeployPlan::prepare(&config).context("Failed to load deploy scripts")?;
    let run_set = plan.run_set();

    if run_set.is_empty() {
        println!("{}", "No scripts to run.".yellow());
    } else {
        println!("{}", "Run order:".bold());
        for (i, path) in run_set.order().enumerate() {
            let Some(script) = plan.script(path) else {
                continue;
            };
            let mut line = format!("  {:>3}. {}", i + 1, script.file_name().cyan());
            if !script.tags.is_empty() {
                line.push_str(&format!(" [{}]", script.tags.join(", ")));
            }
            if !script.dependencies.is_empty() {
                line.push_str(&format!(" needs {}", script.dependencies.join(", ").dimmed()));
            }
            if script.run_at_the_end {
                line.push_str(&format!(" {}", "(at the end)".dimmed()));
            }
            if let Some(id) = &script.id {
                line.push_str(&format!(" {}", format!("(migration {})", id).dimmed()));
            }
            println!("{}", line);
        }
    }

    if args.show_tags {
        println!();
        println!("{}", "Tags:".bold());
        let index = plan.index();
        for tag in index.tags() {
            let scripts: Vec<String> = index
                .paths(tag)
                .iter()
                .filter_map(|p| plan.script(p))
                .map(|s| s.file_name())
                .collect();
            println!("  {} {}", tag.cyan(), scripts.join(", "));
        }
    }

    Ok(())
}
