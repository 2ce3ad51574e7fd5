//! Output module for persisting components and reporting on them
//!
//! This module handles:
//! - Appending records to the JSON collection and the text transcript
//! - Loading a saved collection back
//! - Printing collection and crawl statistics

mod sink;
pub mod stats;
mod transcript;

pub use sink::{load_collection, ComponentSink, SinkError, COLLECTION_FILE, TRANSCRIPT_FILE};
pub use stats::{print_statistics, print_summary, CollectionStatistics};
pub use transcript::format_entry;
