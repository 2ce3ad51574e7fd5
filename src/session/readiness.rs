//! Post-navigation readiness policy

use scraper::{Html, Selector};
use std::time::Duration;

/// Markers whose presence means component content has been rendered:
/// a tab panel, a code block, or a preview frame
pub const DEFAULT_READINESS_MARKERS: &[&str] = &["[role=\"tabpanel\"]", "pre code", "iframe"];

/// Wait for the first of several CSS markers, bounded by a timeout
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    markers: Vec<String>,
    timeout: Duration,
}

impl ReadinessProbe {
    pub fn new(timeout: Duration) -> Self {
        Self::with_markers(
            DEFAULT_READINESS_MARKERS.iter().map(|m| m.to_string()).collect(),
            timeout,
        )
    }

    pub fn with_markers(markers: Vec<String>, timeout: Duration) -> Self {
        Self { markers, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Checks a serialized document for any marker
    pub fn is_satisfied_by(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        self.markers.iter().any(|marker| match Selector::parse(marker) {
            Ok(selector) => document.select(&selector).next().is_some(),
            Err(_) => false,
        })
    }

    /// JavaScript evaluated in the browser; returns `true` once any marker exists
    pub fn script(&self) -> String {
        let markers = serde_json::to_string(&self.markers).unwrap_or_else(|_| "[]".to_string());
        format!(
            "return {}.some(function (s) {{ return document.querySelector(s) !== null; }});",
            markers
        )
    }
}
