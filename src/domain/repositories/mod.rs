//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for data operations. Implementations live in
//! `crate::infrastructure::persistence`; mock implementations are generated
//! via `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`PlanLinkRepository`] - Candidate selection and verdict storage
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod plan_link_repository;

pub use plan_link_repository::{CandidateFilter, PlanLinkRepository, ProviderMatch, StatusCount};

#[cfg(test)]
pub use plan_link_repository::MockPlanLinkRepository;
