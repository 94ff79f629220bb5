//! Probe outcome model.
//!
//! A probe either reached a server and got an HTTP response (whatever its
//! status), or failed before any response arrived. The failure reason is
//! kept so it can be logged and counted instead of being swallowed.

use std::fmt;

/// HTTP method that produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Head,
    Get,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Head => "HEAD",
            ProbeMethod::Get => "GET",
        }
    }
}

/// Why a probe produced no usable HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Timeout,
    Dns,
    Connect,
    Tls,
    TooManyRedirects,
    InvalidUrl(String),
    Cancelled,
    Other(String),
}

impl ProbeFailure {
    /// Short label used as a metrics dimension and log field.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeFailure::Timeout => "timeout",
            ProbeFailure::Dns => "dns",
            ProbeFailure::Connect => "connect",
            ProbeFailure::Tls => "tls",
            ProbeFailure::TooManyRedirects => "too_many_redirects",
            ProbeFailure::InvalidUrl(_) => "invalid_url",
            ProbeFailure::Cancelled => "cancelled",
            ProbeFailure::Other(_) => "other",
        }
    }

    /// Whether another attempt of the whole sequence could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ProbeFailure::InvalidUrl(_) | ProbeFailure::Cancelled | ProbeFailure::TooManyRedirects
        )
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Dns => write!(f, "could not resolve hostname"),
            Self::Connect => write!(f, "connection failed"),
            Self::Tls => write!(f, "TLS handshake failed"),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::InvalidUrl(e) => write!(f, "invalid URL: {}", e),
            Self::Cancelled => write!(f, "probe cancelled"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

/// Result of contacting a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A server answered. `final_url` is the URL after redirects.
    Reached {
        http_status: u16,
        final_url: String,
        method: ProbeMethod,
    },
    /// No HTTP response was obtained.
    Failed { reason: ProbeFailure },
}

impl ProbeOutcome {
    pub fn reached(http_status: u16, final_url: impl Into<String>, method: ProbeMethod) -> Self {
        Self::Reached {
            http_status,
            final_url: final_url.into(),
            method,
        }
    }

    pub fn failed(reason: ProbeFailure) -> Self {
        Self::Failed { reason }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, ProbeOutcome::Reached { .. })
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Reached { http_status, .. } => Some(*http_status),
            ProbeOutcome::Failed { .. } => None,
        }
    }

    pub fn final_url(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Reached { final_url, .. } => Some(final_url),
            ProbeOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&ProbeFailure> {
        match self {
            ProbeOutcome::Reached { .. } => None,
            ProbeOutcome::Failed { reason } => Some(reason),
        }
    }

    /// True for a response whose status is in `[200, 400)`.
    pub fn is_usable(&self) -> bool {
        self.http_status().is_some_and(is_ok_status)
    }
}

/// Status range the pipeline accepts as reachable.
pub fn is_ok_status(status: u16) -> bool {
    (200..400).contains(&status)
}
