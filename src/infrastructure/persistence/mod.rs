//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx with bound
//! parameters for every value.
//!
//! # Repositories
//!
//! - [`PgPlanLinkRepository`] - Candidate selection and verdict storage on `insurance_plans`

pub mod pg_plan_link_repository;

pub use pg_plan_link_repository::{ColumnInfo, PgPlanLinkRepository, verdict_columns};
