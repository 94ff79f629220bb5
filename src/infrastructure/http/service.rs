//! Link prober trait and tuning.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::entities::ProbeOutcome;

/// Default User-Agent sent with every probe.
pub const DEFAULT_USER_AGENT: &str = concat!("PlanLinkVerifier/", env!("CARGO_PKG_VERSION"));

/// Tuning for a single probe sequence.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Timeout of each individual HEAD or GET attempt.
    pub timeout: Duration,
    /// Redirects followed before the attempt fails.
    pub max_redirects: usize,
    /// Extra whole-sequence attempts after a sequence without any HTTP response.
    pub retries: usize,
    /// Pause between whole-sequence attempts.
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15_000),
            max_redirects: 5,
            retries: 1,
            retry_delay: Duration::from_millis(250),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Checks whether a URL answers, and where it ends up.
///
/// Implementations must be safe to call from many tasks at once and must
/// never fail the caller: every problem is reported as
/// [`ProbeOutcome::Failed`].
///
/// # Implementations
///
/// - [`crate::infrastructure::http::HttpLinkProber`] - `reqwest`-backed prober
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkProber: Send + Sync {
    /// Probes `url` and reports the outcome.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}
