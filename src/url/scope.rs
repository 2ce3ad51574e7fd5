use super::normalize::normalize_url;
use crate::UrlError;
use url::Url;

/// Decides which URLs belong to the crawl
///
/// The check is a plain string-prefix comparison against the absolute URL,
/// so `https://example.com/components` admits `/components/forms` and also
/// `/components-v2`. Use a trailing slash in the prefix to exclude siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePrefix(String);

impl ScopePrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Builds a prefix in the same shape as discovered links
    ///
    /// Links reach the scope check after going through `url::Url`, which
    /// lowercases the host and drops default ports. The prefix has to take
    /// that shape too or nothing past the seeds would ever match.
    ///
    /// # Examples
    ///
    /// ```
    /// use component_harvester::url::ScopePrefix;
    ///
    /// let scope = ScopePrefix::parse("https://Example.COM:443/components").unwrap();
    /// assert_eq!(scope.as_str(), "https://example.com/components");
    /// ```
    pub fn parse(prefix: &str) -> Result<Self, UrlError> {
        let url = normalize_url(prefix)?;
        Ok(Self(url.into()))
    }

    /// Returns true if the URL starts with the prefix
    ///
    /// # Examples
    ///
    /// ```
    /// use component_harvester::url::ScopePrefix;
    ///
    /// let scope = ScopePrefix::new("https://example.com/components");
    /// assert!(scope.contains_str("https://example.com/components/forms"));
    /// assert!(!scope.contains_str("https://example.com/pricing"));
    /// ```
    pub fn contains_str(&self, candidate: &str) -> bool {
        candidate.starts_with(&self.0)
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.contains_str(url.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
