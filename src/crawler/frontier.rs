//! Crawl frontier
//!
//! A last-in-first-out stack of pending URLs plus the set of URLs already
//! handed out. Newly discovered links are explored before older queued ones,
//! which follows a chain of detail pages before returning to sibling listings.
//!
//! Duplicates are tolerated on push and filtered on pop: a URL may sit in the
//! stack several times, but `pop_next` hands it out at most once per run.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Frontier {
    /// Pending URLs, top of the stack last
    stack: Vec<String>,

    /// Every URL ever returned by `pop_next`
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier whose first `pop_next` yields the first seed
    pub fn with_seeds(seeds: &[String]) -> Self {
        let mut frontier = Self::new();
        frontier.push_many(seeds.iter().rev().cloned());
        frontier
    }

    pub fn push(&mut self, url: impl Into<String>) {
        self.stack.push(url.into());
    }

    /// Pushes URLs in order; the last one given is popped first
    pub fn push_many<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stack.extend(urls.into_iter().map(Into::into));
    }

    /// Removes and returns the most recently pushed URL not yet visited
    ///
    /// Already-visited URLs found on top of the stack are discarded. The
    /// returned URL is recorded as visited before it is returned, so a URL
    /// re-discovered while its page is still being processed is skipped.
    ///
    /// # Returns
    ///
    /// * `Some(String)` - The next URL to process
    /// * `None` - The stack holds no unvisited URL
    pub fn pop_next(&mut self) -> Option<String> {
        while let Some(url) = self.stack.pop() {
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
            tracing::trace!("Skipping already visited URL: {}", url);
        }
        None
    }

    /// Number of queued entries, duplicates included
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }
}
