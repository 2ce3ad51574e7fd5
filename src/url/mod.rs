//! URL handling module for the harvester
//!
//! This module provides link resolution, URL normalization and crawl-scope
//! matching.

mod normalize;
mod scope;

// Re-export main functions
pub use normalize::{normalize_url, resolve_link};
pub use scope::ScopePrefix;
