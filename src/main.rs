//! `link-verifier`: verifies plan purchase links and stores the verdicts.
//!
//! # Usage
//!
//! ```bash
//! # Verify up to 100 unverified links
//! cargo run --bin link-verifier
//!
//! # Preview verdicts for one provider without writing
//! cargo run --bin link-verifier -- --provider "SURA" --dry-run
//!
//! # Re-verify everything with a wider pool
//! cargo run --bin link-verifier -- --all --limit 5000 --concurrency 32
//! ```

use plan_link_verifier::config::Config;
use plan_link_verifier::domain::repositories::{CandidateFilter, ProviderMatch};
use plan_link_verifier::report;
use plan_link_verifier::runner::{self, RunRequest};

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Verify insurance plan purchase links.
#[derive(Parser)]
#[command(name = "link-verifier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maximum number of plans to verify
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(i64).range(1..))]
    limit: i64,

    /// Only plans whose provider contains this text (case-insensitive)
    #[arg(long)]
    provider: Option<String>,

    /// Match --provider exactly instead of as a substring
    #[arg(long, requires = "provider")]
    exact_provider: bool,

    /// Classify without writing verdicts
    #[arg(long, alias = "dryRun")]
    dry_run: bool,

    /// Re-verify plans that already have a verdict
    #[arg(long)]
    all: bool,

    /// Probes in flight at once (default: min(PROBE_CONCURRENCY, limit))
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Redirects followed per request
    #[arg(long)]
    max_redirects: Option<usize>,

    /// Extra attempts when a link gives no HTTP response
    #[arg(long)]
    retries: Option<usize>,

    /// JSON allow-list replacing the built-in domain policy
    #[arg(long)]
    policy_file: Option<PathBuf>,
}

impl Cli {
    /// Applies command line overrides on top of the environment.
    fn apply(&self, config: &mut Config) {
        if let Some(k) = self.concurrency {
            config.probe_concurrency = k;
        }
        if let Some(ms) = self.timeout_ms {
            config.probe_timeout_ms = ms;
        }
        if let Some(n) = self.max_redirects {
            config.probe_max_redirects = n;
        }
        if let Some(n) = self.retries {
            config.probe_retries = n;
        }
        if let Some(ref path) = self.policy_file {
            config.domain_policy_file = Some(path.clone());
        }
    }

    fn filter(&self) -> CandidateFilter {
        let provider_match = if self.exact_provider {
            ProviderMatch::Exact
        } else {
            ProviderMatch::Partial
        };

        CandidateFilter::new(self.limit)
            .with_provider(self.provider.clone(), provider_match)
            .including_verified(self.all)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;

    runner::init_tracing(&config);
    config.print_summary();

    let request = RunRequest {
        filter: cli.filter(),
        dry_run: cli.dry_run,
        concurrency: runner::effective_concurrency(
            cli.concurrency,
            config.probe_concurrency,
            cli.limit,
        ),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping verification");
            on_interrupt.cancel();
        }
    });

    let summary = runner::run(&config, request, cancel).await?;

    println!();
    print!("{}", report::render(&summary));
    println!();

    Ok(())
}
