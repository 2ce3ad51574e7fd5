//! Plain HTTP session
//!
//! Fetches server-rendered HTML with the session cookies attached. No script
//! runs, so pages that build their component previews client-side will come
//! back without them; the readiness check reports that case instead of
//! waiting for content that can never appear.

use super::{Credentials, ReadinessProbe, RenderError, RenderedPage, Renderer, SessionError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Header carrying the CSRF token on each request
const CSRF_HEADER: &str = "x-xsrf-token";

/// Used when the configuration does not name a user agent
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

pub struct HttpSession {
    client: Client,
    readiness: ReadinessProbe,
}

impl HttpSession {
    /// Builds an HTTP client carrying the credentials on every request
    ///
    /// # Arguments
    ///
    /// * `credentials` - Cookies, CSRF token and user agent
    /// * `readiness` - Markers the fetched document is checked against
    ///
    /// # Returns
    ///
    /// * `Ok(HttpSession)` - Client built successfully
    /// * `Err(SessionError)` - A credential could not be encoded as a header
    pub fn new(credentials: &Credentials, readiness: ReadinessProbe) -> Result<Self, SessionError> {
        let client = build_http_client(credentials)?;
        Ok(Self { client, readiness })
    }
}

/// Builds the reqwest client with authentication headers installed once
pub fn build_http_client(credentials: &Credentials) -> Result<Client, SessionError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    if let Some(cookie_header) = credentials.cookie_header() {
        let mut value = HeaderValue::from_str(cookie_header.expose())
            .map_err(|_| SessionError::InvalidHeader("Cookie"))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    if let Some(token) = &credentials.csrf_token {
        let mut value = HeaderValue::from_str(token.expose())
            .map_err(|_| SessionError::InvalidHeader("X-XSRF-TOKEN"))?;
        value.set_sensitive(true);
        headers.insert(CSRF_HEADER, value);
    }

    let user_agent = credentials
        .user_agent
        .as_deref()
        .unwrap_or(DEFAULT_USER_AGENT);

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

#[async_trait]
impl Renderer for HttpSession {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(|e| RenderError::Snapshot {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let ready = self.readiness.is_satisfied_by(&html);
        if !ready {
            tracing::info!(
                "No readiness marker in {}, continuing with the content that is present",
                final_url
            );
        }

        Ok(RenderedPage {
            url: final_url,
            html,
            ready,
        })
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        RenderError::Navigation {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        RenderError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
