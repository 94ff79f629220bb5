//! Outbound HTTP probing of plan links.
//!
//! - [`LinkProber`] - Probe abstraction consumed by the pipeline
//! - [`HttpLinkProber`] - `reqwest` implementation with HEAD/GET fallback and retry

pub mod reqwest_prober;
pub mod service;

pub use reqwest_prober::HttpLinkProber;
pub use service::{DEFAULT_USER_AGENT, LinkProber, ProbeSettings};

#[cfg(test)]
pub use service::MockLinkProber;
