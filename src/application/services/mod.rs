//! Services for the application layer.

pub mod concurrency_limiter;
pub mod result_persister;
pub mod verification_service;

pub use concurrency_limiter::{ConcurrencyLimiter, TaskFailure};
pub use result_persister::{PersistOutcome, ResultPersister};
pub use verification_service::{RunOptions, VerificationService};
