//! Crawler module for page rendering and processing
//!
//! This module contains the core crawling logic, including:
//! - The LIFO frontier with its visited set
//! - Component extraction from rendered pages
//! - In-scope link discovery
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod frontier;
mod links;

pub use coordinator::{run_crawl, Crawler};
pub use extractor::{BlockError, Extraction, Extractor};
pub use frontier::Frontier;
pub use links::discover_links;

/// Counters collected over one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Pages rendered successfully
    pub pages_visited: usize,

    /// Pages whose render failed
    pub pages_failed: usize,

    /// Rendered pages where no readiness marker appeared in time
    pub pages_not_ready: usize,

    pub records_saved: usize,
    pub records_failed: usize,

    /// Blocks that yielded no record, empty and oversized alike
    pub blocks_dropped: usize,

    /// In-scope links pushed onto the frontier, duplicates across pages included
    pub links_discovered: usize,

    /// Frontier entries left when the crawl stopped
    pub frontier_remaining: usize,

    pub stopped_by_page_cap: bool,
}
