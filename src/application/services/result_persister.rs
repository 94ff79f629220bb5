//! Verdict persistence with dry-run support.

use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::entities::VerificationVerdict;
use crate::domain::policy::DomainPolicy;
use crate::domain::repositories::PlanLinkRepository;

/// What happened to a verdict on its way to the datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Written to the plan row.
    Written,
    /// Dry run, nothing written.
    Skipped,
    /// The write failed. The verdict was computed but is not stored.
    Failed(String),
}

impl PersistOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PersistOutcome::Failed(_))
    }
}

/// Writes verdicts back to plan rows.
///
/// Failures are logged and returned as [`PersistOutcome::Failed`]; they never
/// propagate, so one bad row cannot abort a run.
pub struct ResultPersister<R: PlanLinkRepository> {
    repository: Arc<R>,
    policy: Arc<DomainPolicy>,
}

impl<R: PlanLinkRepository> ResultPersister<R> {
    /// Creates a new persister.
    pub fn new(repository: Arc<R>, policy: Arc<DomainPolicy>) -> Self {
        Self { repository, policy }
    }

    /// Persists `verdict` for a plan of `provider`, unless `dry_run` is set.
    ///
    /// The domain stored alongside the verdict is the resolved domain, or the
    /// provider's official domain when the link did not resolve.
    pub async fn persist(
        &self,
        verdict: &VerificationVerdict,
        provider: &str,
        dry_run: bool,
    ) -> PersistOutcome {
        if dry_run {
            debug!(plan_id = verdict.plan_id, status = %verdict.status, "dry run, verdict not written");
            return PersistOutcome::Skipped;
        }

        let official_domain = verdict
            .resolved_domain
            .clone()
            .or_else(|| self.policy.official_domain(provider).map(str::to_string));

        match self
            .repository
            .save_verdict(verdict.clone(), official_domain)
            .await
        {
            Ok(()) => PersistOutcome::Written,
            Err(e) => {
                error!(
                    plan_id = verdict.plan_id,
                    code = e.code(),
                    details = %e.details(),
                    "failed to persist verdict: {}",
                    e
                );
                metrics::counter!("link_verifier_persist_failures_total").increment(1);
                PersistOutcome::Failed(e.to_string())
            }
        }
    }
}
