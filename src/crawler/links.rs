//! Link discovery
//!
//! Collects every in-scope link target on a rendered page.
//!
//! # Link Rules
//!
//! **Include:**
//! - `<a href="...">` anywhere in the document, resolved against the page URL
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links and data URIs
//! - Fragment-only anchors
//! - Anything that does not start with the scope prefix once resolved
//!
//! Fragments are stripped before the scope check, so `#tab` variants of the
//! same page collapse into one entry.

use crate::url::{resolve_link, ScopePrefix};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Returns the in-scope absolute URLs linked from a page
///
/// Duplicates are removed; the first occurrence keeps its document position.
/// Visited-state is not consulted here, the frontier filters on pop.
///
/// # Arguments
///
/// * `page` - The parsed, rendered document
/// * `base_url` - The page's final URL, used to resolve relative hrefs
/// * `scope` - Prefix a link must start with to be kept
pub fn discover_links(page: &Html, base_url: &Url, scope: &ScopePrefix) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let Ok(anchors) = Selector::parse("a[href]") else {
        return links;
    };

    for element in page.select(&anchors) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(absolute) = resolve_link(href, base_url) else {
            continue;
        };

        if !scope.contains(&absolute) {
            tracing::trace!("Out of scope: {}", absolute);
            continue;
        }

        let absolute = String::from(absolute);
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}
