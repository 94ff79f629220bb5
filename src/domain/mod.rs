//! Domain layer: entities, verification rules and repository contracts.
//!
//! Nothing in here performs I/O. The network and the datastore are reached
//! through traits implemented in [`crate::infrastructure`].
//!
//! # Architecture
//!
//! - [`entities`] - Plan records, probe outcomes, verdicts
//! - [`policy`] - Per-provider domain allow-list
//! - [`classifier`] - Probe outcome to verdict rules
//! - [`repositories`] - Data access trait definitions
//!
//! # Verification Flow
//!
//! 1. Candidates are read through [`repositories::PlanLinkRepository`]
//! 2. Each link is probed by a [`crate::infrastructure::http::LinkProber`]
//! 3. [`classifier::classify`] turns the outcome into a verdict, consulting [`policy::DomainPolicy`]
//! 4. The verdict is written back unless the run is a dry run

pub mod classifier;
pub mod entities;
pub mod policy;
pub mod repositories;
