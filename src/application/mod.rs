//! Application layer: the verification pipeline.
//!
//! This layer wires domain logic (policy, classification) to the repository and
//! prober seams. Services consume traits so they can run against PostgreSQL and
//! real HTTP in production and against in-memory doubles in tests.
//!
//! # Components
//!
//! - [`services::verification_service::VerificationService`] - Fetch, probe, classify, persist
//! - [`services::concurrency_limiter::ConcurrencyLimiter`] - Bounded task execution
//! - [`services::result_persister::ResultPersister`] - Verdict writes with dry-run support
//! - [`summary::RunSummary`] - Aggregated run report

pub mod services;
pub mod summary;
