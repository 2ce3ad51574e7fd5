use crate::UrlError;
use url::Url;

/// Query parameters that only track the visitor and never change the page
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref"];

/// Schemes that never lead to a crawlable page
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Parses an absolute URL and brings it into the form used by the frontier
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme and a host
/// 3. Remove the fragment (everything after #)
/// 4. Remove tracking query parameters (`utm_*`, `fbclid`, ...)
/// 5. Remove an empty query string
///
/// Host case and path are left untouched beyond what the `url` crate already
/// does, so the result can still be compared against a scope prefix copied
/// verbatim from the browser address bar.
///
/// # Examples
///
/// ```
/// use component_harvester::url::normalize_url;
///
/// let url = normalize_url("https://example.com/components/forms#inputs").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/components/forms");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Resolves an `href` found on a page into a normalized absolute URL
///
/// Returns `None` for links that can never be crawled:
/// - empty and fragment-only hrefs (same-page anchors)
/// - `javascript:`, `mailto:`, `tel:` and `data:` targets
/// - anything that fails to resolve or is not HTTP(S) after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_parsed(absolute).ok()
}

fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
