//! Upkeep - Module Upgrade Pipeline
//!
//! Usage:
//!   upkeep status               # Deployed vs. latest version of every module
//!   upkeep upgrade <name>       # Upgrade one module
//!   upkeep batch [names...]     # Upgrade several (or all) modules in order
//!   upkeep backups <name>       # List snapshots of a module's deployment

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upkeep_core::backup::BackupEntry;
use upkeep_core::config::ConfigStore;
use upkeep_core::context::AppContext;
use upkeep_core::events::TracingSink;
use upkeep_core::service::UpgradeService;
use upkeep_core::status::StatusSummary;
use upkeep_core::types::{ModuleStatus, UpgradeOutcome, VersionState};

#[derive(Parser)]
#[command(name = "upkeep")]
#[command(about = "Fetch, build and redeploy independently versioned modules", long_about = None)]
struct Cli {
    /// Path to upkeep.toml (default: <config dir>/upkeep/upkeep.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show deployed and latest versions of every module
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Upgrade a single module
    Upgrade {
        /// Module name as configured
        name: String,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Upgrade modules one after another (all when no names are given)
    Batch {
        /// Module names; configuration order is kept
        names: Vec<String>,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List backups of a module, newest first
    Backups {
        /// Module name as configured
        name: String,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upkeep=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ok = run_cli(cli)?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns whether every requested upgrade succeeded.
fn run_cli(cli: Cli) -> Result<bool> {
    let service = load_service(cli.config)?;

    match cli.command {
        Commands::Status { format } => {
            let statuses = service.modules_status();
            match format {
                OutputFormat::Table => print_status_table(&statuses),
                OutputFormat::Json => print_status_json(&statuses)?,
            }
            Ok(true)
        }
        Commands::Upgrade { name, format } => {
            let outcome = service.upgrade_module(&name);
            print_outcomes(std::slice::from_ref(&outcome), format)?;
            Ok(outcome.success)
        }
        Commands::Batch { names, format } => {
            let selection = if names.is_empty() {
                None
            } else {
                Some(names.as_slice())
            };
            let outcomes = service.batch_upgrade(selection);
            print_outcomes(&outcomes, format)?;
            Ok(outcomes.iter().all(|o| o.success))
        }
        Commands::Backups { name, format } => {
            let backups = service.backups(&name)?;
            match format {
                OutputFormat::Table => print_backups_table(&name, &backups),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&backups)?),
            }
            Ok(true)
        }
    }
}

fn load_service(config_path: Option<PathBuf>) -> Result<UpgradeService> {
    let store = match config_path {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::from_default_location()?,
    };
    let config = store.load()?;
    if config.modules.is_empty() {
        tracing::warn!(
            config = %store.config_path().display(),
            "no modules configured"
        );
    }
    let ctx = AppContext::from_config(&config);
    Ok(ctx.upgrade_service(config.modules, Arc::new(TracingSink)))
}

// =============================================================================
// Status output
// =============================================================================

fn print_status_table(statuses: &[ModuleStatus]) {
    if statuses.is_empty() {
        println!("No modules configured.");
        println!("Add [[module]] entries to upkeep.toml to get started.");
        return;
    }

    println!(
        "  {:<18} {:<14} {:<12} {:<12} {:<11} Last Updated",
        "Name", "Kind", "Current", "Latest", "Status"
    );
    println!("  {}", "-".repeat(88));

    for status in statuses {
        let state = match status.status {
            VersionState::UpToDate => style(status.status.as_str()).green(),
            VersionState::Outdated => style(status.status.as_str()).yellow(),
        };
        let updated = status
            .last_updated
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:<18} {:<14} {:<12} {:<12} {:<11} {}",
            truncate(&status.name, 18),
            status.kind.as_str(),
            truncate(&status.current_version, 12),
            truncate(&status.latest_version, 12),
            state,
            updated
        );
        if let Some(error) = &status.error {
            println!("    {} {}", style("!").red(), error);
        }
    }

    let summary = StatusSummary::from_statuses(statuses);
    println!();
    if summary.issues > 0 {
        println!(
            "Summary: {} modules, {} up-to-date, {} outdated, {} with issues",
            summary.total, summary.up_to_date, summary.outdated, summary.issues
        );
    } else {
        println!(
            "Summary: {} modules, {} up-to-date, {} outdated",
            summary.total, summary.up_to_date, summary.outdated
        );
    }
}

fn print_status_json(statuses: &[ModuleStatus]) -> Result<()> {
    let output = serde_json::json!({
        "schema_version": 1,
        "modules": statuses,
        "summary": StatusSummary::from_statuses(statuses),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// =============================================================================
// Upgrade output
// =============================================================================

fn print_outcomes(outcomes: &[UpgradeOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            print_outcome_table(outcomes);
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcomes)?);
            Ok(())
        }
    }
}

fn print_outcome_table(outcomes: &[UpgradeOutcome]) {
    if outcomes.is_empty() {
        println!("Nothing to upgrade.");
        return;
    }

    for outcome in outcomes {
        let verdict = if outcome.success {
            style("OK").green().bold()
        } else {
            style("FAILED").red().bold()
        };
        println!(
            "  {:<18} {:<8} {}",
            truncate(&outcome.module_name, 18),
            verdict,
            outcome.message
        );
        if let Some(backup) = &outcome.backup_path {
            println!("  {:<18} {:<8} backup: {}", "", "", backup.display());
        }
    }

    let failed = outcomes.iter().filter(|o| !o.success).count();
    if outcomes.len() > 1 {
        println!();
        println!(
            "Summary: {} upgraded, {} failed",
            outcomes.len() - failed,
            failed
        );
    }
}

// =============================================================================
// Backup output
// =============================================================================

fn print_backups_table(name: &str, backups: &[BackupEntry]) {
    if backups.is_empty() {
        println!("No backups for {}.", name);
        return;
    }

    println!("Backups of {} ({}):", style(name).bold(), backups.len());
    for backup in backups {
        let taken = backup
            .taken_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<28} {}", taken, backup.path.display());
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
