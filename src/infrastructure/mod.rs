//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence and network probing.
//!
//! # Modules
//!
//! - [`http`] - Link probing over HTTP
//! - [`persistence`] - PostgreSQL repository implementations

pub mod http;
pub mod persistence;
