//! Utility functions for URL processing.
//!
//! - [`url_normalizer`] - URL normalization and location comparison
//! - [`extract_domain`] - Hostname extraction from URLs and allow-list entries

pub mod extract_domain;
pub mod url_normalizer;
