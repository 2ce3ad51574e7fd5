//! Statistics over the saved collection and the finished crawl
//!
//! This module provides the totals printed by `--stats` and the summary
//! printed at the end of a crawl.

use crate::crawler::CrawlSummary;
use crate::record::ComponentRecord;
use std::collections::HashMap;

/// Totals over a saved collection
#[derive(Debug, Clone, Default)]
pub struct CollectionStatistics {
    pub total_records: usize,

    /// Records carrying a markup variant
    pub with_markup: usize,

    /// Records carrying a code variant
    pub with_code: usize,

    /// Records carrying both variants
    pub with_both: usize,

    /// Record count per source page
    pub records_by_page: HashMap<String, usize>,
}

impl CollectionStatistics {
    /// Tallies a loaded collection
    pub fn from_records(records: &[ComponentRecord]) -> Self {
        let mut stats = Self {
            total_records: records.len(),
            ..Self::default()
        };

        for record in records {
            if record.has_markup() {
                stats.with_markup += 1;
            }
            if record.has_code() {
                stats.with_code += 1;
            }
            if record.has_markup() && record.has_code() {
                stats.with_both += 1;
            }
            *stats
                .records_by_page
                .entry(record.source_url.clone())
                .or_insert(0) += 1;
        }

        stats
    }

    pub fn unique_pages(&self) -> usize {
        self.records_by_page.len()
    }
}

/// Prints collection statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CollectionStatistics) {
    println!("=== Collection Statistics ===\n");

    println!("Overview:");
    println!("  Total components: {}", stats.total_records);
    println!("  Source pages: {}", stats.unique_pages());
    println!();

    println!("Variants:");
    for (label, count) in [
        ("Markup", stats.with_markup),
        ("Code", stats.with_code),
        ("Both", stats.with_both),
    ] {
        let percentage = if stats.total_records > 0 {
            (count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if !stats.records_by_page.is_empty() {
        println!("Components by Page:");
        // Sort pages by count (descending), then by URL
        let mut page_counts: Vec<_> = stats.records_by_page.iter().collect();
        page_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (page, count) in page_counts {
            println!("  {}: {}", page, count);
        }
        println!();
    }
}

/// Prints the end-of-crawl summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!(
        "\nScraped {} components from {} pages\n",
        summary.records_saved, summary.pages_visited
    );

    println!("Pages:");
    println!("  Rendered: {}", summary.pages_visited);
    println!("  Failed: {}", summary.pages_failed);
    println!("  Rendered before content appeared: {}", summary.pages_not_ready);
    println!();

    println!("Components:");
    println!("  Saved: {}", summary.records_saved);
    println!("  Failed to save: {}", summary.records_failed);
    println!("  Blocks dropped: {}", summary.blocks_dropped);
    println!();

    println!("Links:");
    println!("  Discovered in scope: {}", summary.links_discovered);
    println!("  Left in frontier: {}", summary.frontier_remaining);

    if summary.stopped_by_page_cap {
        println!("\nStopped at the configured page cap");
    }
}
