//! Maps a probe outcome to a verification verdict.

use chrono::{DateTime, Utc};

use crate::domain::entities::{
    LinkStatus, PlanLinkRecord, ProbeOutcome, VerificationVerdict, probe::is_ok_status,
};
use crate::domain::policy::DomainPolicy;
use crate::utils::extract_domain::extract_hostname;
use crate::utils::url_normalizer::same_location;

/// Classifies one probed record.
///
/// Rules, first match wins:
///
/// 1. No HTTP response: [`LinkStatus::Broken`].
/// 2. Status outside `[200, 400)`: broken. An error page is still broken.
/// 3. Final host off the provider's allow-list: broken, whatever the status.
/// 4. Final URL is the stored link: [`LinkStatus::Valid`].
/// 5. Otherwise [`LinkStatus::Redirected`] with the new URL.
///
/// Broken verdicts never carry a final URL or resolved domain.
pub fn classify(
    record: &PlanLinkRecord,
    outcome: &ProbeOutcome,
    policy: &DomainPolicy,
    checked_at: DateTime<Utc>,
) -> VerificationVerdict {
    let ProbeOutcome::Reached {
        http_status,
        final_url,
        ..
    } = outcome
    else {
        return VerificationVerdict::broken(record.id, checked_at);
    };

    let Some(hostname) = extract_hostname(final_url) else {
        return VerificationVerdict::broken(record.id, checked_at);
    };

    if !is_ok_status(*http_status) {
        return VerificationVerdict::broken(record.id, checked_at);
    }

    let Some(resolved_domain) = policy.matched_domain(&record.provider, &hostname) else {
        return VerificationVerdict::broken(record.id, checked_at);
    };

    let unchanged = record
        .probe_target()
        .is_some_and(|original| same_location(original, final_url));

    let status = if unchanged {
        LinkStatus::Valid
    } else {
        LinkStatus::Redirected
    };

    VerificationVerdict::reachable(
        record.id,
        status,
        final_url.clone(),
        checked_at,
        Some(resolved_domain),
    )
}
