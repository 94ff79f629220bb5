//! Link verification pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::application::services::concurrency_limiter::{ConcurrencyLimiter, TaskFailure};
use crate::application::services::result_persister::ResultPersister;
use crate::application::summary::{ResultRow, RunSummary};
use crate::domain::classifier::classify;
use crate::domain::entities::{LinkStatus, PlanLinkRecord, ProbeFailure};
use crate::domain::policy::DomainPolicy;
use crate::domain::repositories::{CandidateFilter, PlanLinkRepository};
use crate::error::AppError;
use crate::infrastructure::http::LinkProber;

/// Per-run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Classify without writing verdicts.
    pub dry_run: bool,
    /// Probes allowed in flight at once.
    pub concurrency: usize,
}

/// Verifies plan links: fetch, probe, classify, persist.
///
/// Every record goes through probe → classify → persist in sequence on its
/// own task; records are independent of each other. Per-record problems
/// (network failures, write failures, even panics) are contained and show up
/// in the [`RunSummary`]. Only the candidate query can fail a run.
pub struct VerificationService<R: PlanLinkRepository, P: LinkProber> {
    repository: Arc<R>,
    prober: Arc<P>,
    policy: Arc<DomainPolicy>,
    persister: Arc<ResultPersister<R>>,
    cancel: CancellationToken,
}

impl<R, P> VerificationService<R, P>
where
    R: PlanLinkRepository + 'static,
    P: LinkProber + 'static,
{
    /// Creates a new verification service.
    pub fn new(repository: Arc<R>, prober: Arc<P>, policy: Arc<DomainPolicy>) -> Self {
        let persister = Arc::new(ResultPersister::new(repository.clone(), policy.clone()));
        Self {
            repository,
            prober,
            policy,
            persister,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops scheduling new records once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs one verification pass over the candidates selected by `filter`.
    ///
    /// # Errors
    ///
    /// Returns the repository error if candidates cannot be fetched. Nothing
    /// has been probed at that point.
    pub async fn run(
        &self,
        filter: CandidateFilter,
        options: RunOptions,
    ) -> Result<RunSummary, AppError> {
        let candidates = self.repository.fetch_candidates(filter).await?;

        let mut summary = RunSummary::new(options.dry_run);
        summary.candidates = candidates.len();

        let (probeable, without_link): (Vec<PlanLinkRecord>, Vec<PlanLinkRecord>) = candidates
            .into_iter()
            .partition(|record| record.probe_target().is_some());
        summary.without_link = without_link.len();

        let limiter =
            ConcurrencyLimiter::new(options.concurrency).with_cancellation(self.cancel.clone());
        let checked_at = Utc::now();

        info!(
            candidates = summary.candidates,
            without_link = summary.without_link,
            concurrency = limiter.capacity(),
            dry_run = options.dry_run,
            "starting verification run"
        );

        let tasks = probeable.iter().cloned().map(|record| {
            let span = info_span!("verify_link", plan_id = record.id, provider = %record.provider);
            verify_record(
                record,
                self.prober.clone(),
                self.policy.clone(),
                self.persister.clone(),
                checked_at,
                options.dry_run,
            )
            .instrument(span)
        });

        let results = limiter.run_all(tasks).await;

        for (record, result) in probeable.iter().zip(results) {
            match result {
                Ok(Some(row)) => summary.record(row),
                Ok(None) | Err(TaskFailure::Cancelled) => summary.interrupted += 1,
                Err(TaskFailure::Panicked(message)) => {
                    error!(plan_id = record.id, "verification task failed: {}", message);
                    summary.task_failures += 1;
                }
            }
        }

        info!("{}", summary.totals_line());

        Ok(summary)
    }
}

/// Probe, classify and persist one record.
///
/// Returns `None` when the probe was cancelled; such records keep whatever
/// verdict they had.
async fn verify_record<R: PlanLinkRepository, P: LinkProber>(
    record: PlanLinkRecord,
    prober: Arc<P>,
    policy: Arc<DomainPolicy>,
    persister: Arc<ResultPersister<R>>,
    checked_at: DateTime<Utc>,
    dry_run: bool,
) -> Option<ResultRow> {
    let link = record.probe_target()?.to_string();

    let outcome = prober.probe(&link).await;

    if let Some(reason) = outcome.failure_reason() {
        if *reason == ProbeFailure::Cancelled {
            return None;
        }
        warn!(url = %link, reason = %reason, "link unreachable");
        metrics::counter!("link_verifier_probe_failures_total", "reason" => reason.label())
            .increment(1);
    }

    let verdict = classify(&record, &outcome, &policy, checked_at);

    if verdict.status == LinkStatus::Broken && outcome.is_usable() {
        info!(
            url = %link,
            final_url = outcome.final_url().unwrap_or_default(),
            "link resolved outside the provider's domains"
        );
    }

    metrics::counter!("link_verifier_verdicts_total", "status" => verdict.status.as_str())
        .increment(1);

    let persist = persister.persist(&verdict, &record.provider, dry_run).await;

    Some(ResultRow {
        id: record.id,
        provider: record.provider,
        status: verdict.status,
        final_url: verdict.final_url,
        persist,
    })
}
