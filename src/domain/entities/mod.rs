//! Core domain entities of the link verification pipeline.
//!
//! Entities are plain data structures; the rules that produce them live in
//! [`crate::domain::classifier`] and [`crate::domain::policy`].
//!
//! # Entity Types
//!
//! - [`PlanLinkRecord`] - A plan row whose purchase link is to be checked
//! - [`ProbeOutcome`] - What happened when a URL was contacted
//! - [`VerificationVerdict`] - The classification persisted for one plan

pub mod plan_link;
pub mod probe;
pub mod verdict;

pub use plan_link::PlanLinkRecord;
pub use probe::{ProbeFailure, ProbeMethod, ProbeOutcome};
pub use verdict::{LinkStatus, VerificationVerdict};
