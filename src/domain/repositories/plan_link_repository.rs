//! Repository trait for plan link candidates and verdict storage.

use crate::domain::entities::{LinkStatus, PlanLinkRecord, VerificationVerdict};
use crate::error::AppError;
use async_trait::async_trait;

/// How the `--provider` filter is compared against the stored provider name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderMatch {
    /// Case-insensitive substring match.
    #[default]
    Partial,
    /// Case-insensitive equality.
    Exact,
}

/// Filter criteria for candidate selection.
///
/// Candidates always exclude rows with a `NULL` or blank `external_link`
/// and are ordered by ascending id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    pub provider: Option<String>,
    pub provider_match: ProviderMatch,
    pub limit: i64,
    /// When true, only rows without a stored `link_status` are returned.
    pub only_unverified: bool,
}

impl CandidateFilter {
    /// Creates a filter for an incremental run over unverified rows.
    pub fn new(limit: i64) -> Self {
        Self {
            provider: None,
            provider_match: ProviderMatch::Partial,
            limit,
            only_unverified: true,
        }
    }

    /// Restricts candidates to one provider.
    pub fn with_provider(mut self, provider: Option<String>, provider_match: ProviderMatch) -> Self {
        self.provider = provider
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.provider_match = provider_match;
        self
    }

    /// Includes rows that already carry a verdict (re-verification sweep).
    pub fn including_verified(mut self, include: bool) -> Self {
        self.only_unverified = !include;
        self
    }

    /// Provider pattern for SQL `ILIKE`, with wildcards escaped.
    pub fn provider_pattern(&self) -> Option<String> {
        self.provider.as_ref().map(|p| {
            let escaped = p
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            match self.provider_match {
                ProviderMatch::Partial => format!("%{}%", escaped),
                ProviderMatch::Exact => escaped,
            }
        })
    }
}

/// Number of plans per stored status. `status == None` counts unverified rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: Option<LinkStatus>,
    pub count: i64,
}

/// Repository interface over the `insurance_plans` table.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgPlanLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_plan_link.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanLinkRepository: Send + Sync {
    /// Reads the plans to verify in this run.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn fetch_candidates(&self, filter: CandidateFilter)
    -> Result<Vec<PlanLinkRecord>, AppError>;

    /// Overwrites the stored verdict of `verdict.plan_id`.
    ///
    /// `official_domain` is written to `provider_official_domain` when the
    /// column exists and ignored otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no plan has that id.
    /// Returns [`AppError::Database`] on database errors.
    async fn save_verdict(
        &self,
        verdict: VerificationVerdict,
        official_domain: Option<String>,
    ) -> Result<(), AppError>;

    /// Counts plans with a link per stored status, optionally for one provider.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn status_counts(&self, provider: Option<String>) -> Result<Vec<StatusCount>, AppError>;

    /// Clears stored verdicts so the next incremental run checks them again.
    ///
    /// Returns the number of rows reset.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn reset_verdicts(&self, provider: Option<String>) -> Result<u64, AppError>;
}
