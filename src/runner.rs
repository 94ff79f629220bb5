//! Pipeline runtime setup.
//!
//! Handles the domain policy, database pool, prober construction and the
//! verification run itself.

use crate::application::services::{RunOptions, VerificationService};
use crate::application::summary::RunSummary;
use crate::config::Config;
use crate::domain::policy::DomainPolicy;
use crate::domain::repositories::CandidateFilter;
use crate::infrastructure::http::HttpLinkProber;
use crate::infrastructure::persistence::PgPlanLinkRepository;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// What a single invocation should verify.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub filter: CandidateFilter,
    pub dry_run: bool,
    /// Probes in flight, already resolved with [`effective_concurrency`].
    pub concurrency: usize,
}

/// Limiter capacity for a run.
///
/// An explicit value wins; otherwise the configured ceiling, reduced to the
/// candidate limit so small runs do not hold idle slots.
pub fn effective_concurrency(explicit: Option<usize>, ceiling: usize, limit: i64) -> usize {
    match explicit {
        Some(k) => k.max(1),
        None => {
            let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
            ceiling.min(limit).max(1)
        }
    }
}

/// Installs the global `tracing` subscriber (`text` or `json`).
pub fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

/// Loads the domain policy: the configured file, or the built-in allow-list.
///
/// # Errors
///
/// Returns an error if a configured policy file is unreadable or malformed.
pub fn load_policy(config: &Config) -> Result<DomainPolicy> {
    match config.domain_policy_file {
        Some(ref path) => {
            let policy = DomainPolicy::from_json_file(path)
                .with_context(|| format!("Failed to load domain policy {}", path.display()))?;
            tracing::info!(
                "Loaded domain policy for {} providers from {}",
                policy.len(),
                path.display()
            );
            Ok(policy)
        }
        None => Ok(DomainPolicy::builtin()),
    }
}

/// Runs one verification pass.
///
/// Initializes:
/// - Domain policy
/// - PostgreSQL connection pool sized for the probe concurrency
/// - HTTP prober
///
/// # Errors
///
/// Returns an error if:
/// - The policy file cannot be loaded
/// - Database connection fails
/// - The candidate query fails
pub async fn run(
    config: &Config,
    request: RunRequest,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let policy = Arc::new(load_policy(config)?);

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size(request.concurrency))
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    let repository = PgPlanLinkRepository::connect(Arc::new(pool))
        .await
        .context("Failed to inspect insurance_plans")?;
    if !repository.records_official_domain() {
        tracing::info!("provider_official_domain column not found, official domains will not be stored");
    }

    let prober = HttpLinkProber::new(config.probe_settings())
        .context("Failed to build HTTP client")?
        .with_cancellation(cancel.clone());

    let service = VerificationService::new(Arc::new(repository), Arc::new(prober), policy)
        .with_cancellation(cancel);

    let summary = service
        .run(
            request.filter,
            RunOptions {
                dry_run: request.dry_run,
                concurrency: request.concurrency,
            },
        )
        .await
        .context("Verification run failed")?;

    Ok(summary)
}
