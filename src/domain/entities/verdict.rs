//! Verification verdict entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification assigned to a plan's link for one run.
///
/// Stored in the `link_status` column as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Valid,
    Redirected,
    Broken,
}

impl LinkStatus {
    pub const ALL: [LinkStatus; 3] = [LinkStatus::Valid, LinkStatus::Redirected, LinkStatus::Broken];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Valid => "valid",
            LinkStatus::Redirected => "redirected",
            LinkStatus::Broken => "broken",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valid" => Ok(LinkStatus::Valid),
            "redirected" => Ok(LinkStatus::Redirected),
            "broken" => Ok(LinkStatus::Broken),
            other => Err(format!("unknown link status '{}'", other)),
        }
    }
}

/// The outcome of verifying one plan's link.
///
/// `final_url` is always `None` for [`LinkStatus::Broken`]; use
/// [`VerificationVerdict::broken`] to build those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationVerdict {
    pub plan_id: i64,
    pub status: LinkStatus,
    pub final_url: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub resolved_domain: Option<String>,
}

impl VerificationVerdict {
    pub fn broken(plan_id: i64, checked_at: DateTime<Utc>) -> Self {
        Self {
            plan_id,
            status: LinkStatus::Broken,
            final_url: None,
            checked_at,
            resolved_domain: None,
        }
    }

    pub fn reachable(
        plan_id: i64,
        status: LinkStatus,
        final_url: String,
        checked_at: DateTime<Utc>,
        resolved_domain: Option<String>,
    ) -> Self {
        Self {
            plan_id,
            status,
            final_url: Some(final_url),
            checked_at,
            resolved_domain,
        }
    }
}
