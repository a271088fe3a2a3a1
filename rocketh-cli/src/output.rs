//! Terminal output of deploy runs

use colored::*;
use rocketh_core::domain::script::{ScriptMetadata, file_name};
use rocketh_executor::{ExecutorError, RunObserver, RunSummary, SkipReason};

/// Observer printing script progress to stdout
pub struct CliObserver;

impl RunObserver for CliObserver {
    fn script_started(&self, script: &ScriptMetadata) {
        println!("{} {}", "→".cyan(), script.file_name());
    }

    fn script_skipped(&self, script: &ScriptMetadata, reason: &SkipReason) {
        println!(
            "  {} {} ({})",
            "skipped".yellow(),
            script.file_name(),
            reason
        );
    }

    fn script_succeeded(&self, script: &ScriptMetadata) {
        println!("  {} {}", "✓".green(), script.file_name());
    }

    fn script_failed(&self, script: &ScriptMetadata, error: &ExecutorError) {
        eprintln!("  {} {}: {}", "✗".red().bold(), script.file_name(), error);
    }
}

pub fn print_summary(summary: &RunSummary) {
    let recovery = &summary.recovery;
    if !recovery.is_empty() {
        println!();
        println!("{}", "Recovered pending deployments:".bold());
        for name in &recovery.promoted {
            println!("  {} {}", "promoted".green(), name);
        }
        for (name, reason) in &recovery.failed {
            println!("  {} {} ({})", "failed".red(), name, reason);
        }
        for name in &recovery.pending {
            println!("  {} {}", "still pending".yellow(), name);
        }
    }

    println!();
    println!(
        "{} {} executed, {} skipped",
        "✓ Done:".green().bold(),
        summary.executed.len(),
        summary.skipped.len()
    );
    if !summary.skipped.is_empty() {
        let skipped: Vec<String> = summary.skipped.iter().map(|p| file_name(p)).collect();
        println!("  skipped: {}", skipped.join(", ").dimmed());
    }

    if !summary.deployments.is_empty() {
        println!();
        println!("{}", "Deployments:".bold());
        for (name, deployment) in &summary.deployments {
            println!("  {:<24} {}", name.cyan(), deployment.address);
        }
    }
}
