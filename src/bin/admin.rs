//! CLI administration tool for plan-link-verifier.
//!
//! Provides commands for inspecting and preparing the `insurance_plans`
//! table without running a verification pass.
//!
//! # Usage
//!
//! ```bash
//! # Check database connection
//! cargo run --bin admin -- db check
//!
//! # Add the verdict columns to an existing table
//! cargo run --bin admin -- db ensure-columns
//!
//! # Verdict breakdown, optionally for one provider
//! cargo run --bin admin -- stats --provider sura
//!
//! # Clear verdicts so the next run checks those plans again
//! cargo run --bin admin -- reset --provider sura
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (or `RENDER_POSTGRES_URL`, or `DB_*` components): PostgreSQL connection

use plan_link_verifier::config::{self, mask_connection_string};
use plan_link_verifier::domain::entities::LinkStatus;
use plan_link_verifier::domain::repositories::PlanLinkRepository;
use plan_link_verifier::infrastructure::persistence::PgPlanLinkRepository;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// CLI tool for managing plan link verdicts.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Show verdict counts per status
    Stats {
        /// Only plans whose provider contains this text
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Clear stored verdicts
    Reset {
        /// Only plans whose provider contains this text
        #[arg(short, long)]
        provider: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Add missing verdict columns to insurance_plans
    EnsureColumns,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(&config.database_url)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to {}",
                mask_connection_string(&config.database_url)
            )
        })?;

    let repo = PgPlanLinkRepository::connect(Arc::new(pool))
        .await
        .context("Failed to inspect insurance_plans")?;

    match cli.command {
        Commands::Stats { provider } => handle_stats(&repo, provider).await?,
        Commands::Reset { provider, yes } => handle_reset(&repo, provider, yes).await?,
        Commands::Db { action } => handle_db_action(&repo, action).await?,
    }

    Ok(())
}

/// Displays verdict counts.
///
/// # Output Format
///
/// ```text
/// 📊 Link verdicts
///
///   valid        812
///   redirected    64
///   broken        37
///   unverified   120
///   ────────────────
///   Total       1033
/// ```
async fn handle_stats(repo: &PgPlanLinkRepository, provider: Option<String>) -> Result<()> {
    match provider {
        Some(ref p) => println!(
            "{} {}",
            "📊 Link verdicts for".bright_blue().bold(),
            p.cyan()
        ),
        None => println!("{}", "📊 Link verdicts".bright_blue().bold()),
    }
    println!();

    let counts = repo
        .status_counts(provider)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to count verdicts: {}", e))?;

    let count_of = |status: Option<LinkStatus>| -> i64 {
        counts
            .iter()
            .filter(|c| c.status == status)
            .map(|c| c.count)
            .sum()
    };

    for status in LinkStatus::ALL {
        let n = count_of(Some(status)).to_string();
        let painted = match status {
            LinkStatus::Valid => n.green(),
            LinkStatus::Redirected => n.yellow(),
            LinkStatus::Broken => n.red(),
        };
        println!("  {:<12} {:>6}", status.as_str(), painted.bold());
    }
    println!(
        "  {:<12} {:>6}",
        "unverified",
        count_of(None).to_string().bright_black()
    );

    let total: i64 = counts.iter().map(|c| c.count).sum();
    println!("  {}", "─".repeat(19).bright_black());
    println!(
        "  {:<12} {:>6}",
        "Total",
        total.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Clears verdicts with a confirmation prompt.
///
/// # Safety
///
/// - Requires confirmation (default: No) unless `--yes`
async fn handle_reset(
    repo: &PgPlanLinkRepository,
    provider: Option<String>,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "♻️  Reset link verdicts".bright_blue().bold());
    println!();

    let scope = match provider {
        Some(ref p) => format!("plans whose provider matches '{}'", p),
        None => "all plans".to_string(),
    };
    println!("  Scope: {}", scope.cyan());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Clear stored verdicts?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let reset = repo
        .reset_verdicts(provider)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to reset verdicts: {}", e))?;

    println!();
    println!(
        "{} {}",
        "✅ Verdicts cleared:".green().bold(),
        reset.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(repo: &PgPlanLinkRepository, action: DbAction) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            let plans = repo
                .count_plans()
                .await
                .map_err(|e| anyhow::anyhow!("Cannot read insurance_plans: {}", e))?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!("  Plans: {}", plans.to_string().bright_white());
            if !repo.records_official_domain() {
                println!(
                    "  {}",
                    "provider_official_domain column missing (run `admin db ensure-columns`)"
                        .yellow()
                );
            }
        }
        DbAction::EnsureColumns => {
            println!("{}", "🛠️  Ensuring verdict columns".bright_blue().bold());
            println!();

            let columns = repo
                .ensure_columns()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to add columns: {}", e))?;

            for column in &columns {
                println!(
                    "  {:<26} {:<26} {}",
                    column.name.cyan(),
                    column.data_type.bright_white(),
                    if column.nullable {
                        "NULL".bright_black()
                    } else {
                        "NOT NULL".bright_black()
                    }
                );
            }
            println!();
            println!("{}", "✅ Verdict columns present".green().bold());
        }
    }

    Ok(())
}
