//! Plan link entity read from the `insurance_plans` table.

/// An insurance plan row as seen by the verifier.
///
/// Only the columns the pipeline needs are loaded. The record is never
/// modified; verdicts are written through
/// [`crate::domain::repositories::PlanLinkRepository::save_verdict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLinkRecord {
    pub id: i64,
    pub provider: String,
    pub external_link: Option<String>,
}

impl PlanLinkRecord {
    /// Creates a new PlanLinkRecord instance.
    pub fn new(id: i64, provider: String, external_link: Option<String>) -> Self {
        Self {
            id,
            provider,
            external_link,
        }
    }

    /// Returns the link to probe, or `None` when the row has nothing to check.
    ///
    /// Blank links are treated the same as `NULL`.
    pub fn probe_target(&self) -> Option<&str> {
        self.external_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}
