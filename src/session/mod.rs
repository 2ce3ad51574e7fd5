//! Rendering sessions
//!
//! A session owns the authentication artifacts for the target site and turns
//! a URL into a rendered document. The crawler only sees the [`Renderer`]
//! trait, which lets a WebDriver-driven browser, a plain HTTP client, or a
//! canned fake in tests sit behind the same crawl loop.
//!
//! Browser binaries are never launched from here: the WebDriver backend talks
//! to an endpoint that is already running.

mod credentials;
mod http;
mod readiness;
mod webdriver;

pub use credentials::{Credentials, Secret, SessionCookie};
pub use http::HttpSession;
pub use readiness::{ReadinessProbe, DEFAULT_READINESS_MARKERS};
pub use webdriver::{WebDriverOptions, WebDriverSession};

use crate::config::{DriverKind, SessionConfig};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A document as it looked after navigation and the readiness wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL the session ended up on (after redirects)
    pub url: String,

    /// Serialized DOM
    pub html: String,

    /// Whether a readiness marker appeared before the readiness timeout
    pub ready: bool,
}

/// Errors raised while rendering a single page
///
/// These never abort a crawl; the crawl loop logs them and moves on.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation to {url} timed out")]
    Timeout { url: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Could not read rendered document for {url}: {message}")]
    Snapshot { url: String, message: String },
}

/// Errors raised while establishing or tearing down a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("Failed to establish session: {0}")]
    Establish(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error(
        "No session cookies or CSRF token found in HARVEST_COOKIES / HARVEST_CSRF_TOKEN \
         (set allow-anonymous = true under [session] to crawl public pages only)"
    )]
    MissingCredentials,
}

/// Capability to turn a URL into a rendered document
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url` and returns the document once it is ready
    ///
    /// `timeout` bounds the navigation itself. The readiness wait has its own
    /// bound and running out of it is not an error: the page comes back with
    /// `ready == false`.
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError>;

    /// Releases the remote session, if any
    async fn shutdown(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

#[async_trait]
impl<T: Renderer + ?Sized> Renderer for Box<T> {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError> {
        (**self).render(url, timeout).await
    }

    async fn shutdown(&self) -> Result<(), SessionError> {
        (**self).shutdown().await
    }
}

/// Establishes the session selected by the configuration
///
/// # Arguments
///
/// * `config` - Session section of the configuration
/// * `origin_url` - A URL on the target site; cookies are installed against it
/// * `credentials` - Cookies, CSRF token and user agent
///
/// # Returns
///
/// * `Ok(Box<dyn Renderer>)` - A ready-to-use session
/// * `Err(SessionError)` - The session could not be established (fatal)
pub async fn connect(
    config: &SessionConfig,
    origin_url: &str,
    credentials: Credentials,
) -> Result<Box<dyn Renderer>, SessionError> {
    let readiness = ReadinessProbe::new(Duration::from_millis(config.readiness_timeout_ms));
    let credentials = match &config.user_agent {
        Some(agent) if credentials.user_agent.is_none() => {
            credentials.with_user_agent(agent.clone())
        }
        _ => credentials,
    };

    match config.driver {
        DriverKind::Http => {
            tracing::info!("Using plain HTTP session (no script execution)");
            Ok(Box::new(HttpSession::new(&credentials, readiness)?))
        }
        DriverKind::Webdriver => {
            let endpoint = config
                .webdriver_url
                .clone()
                .ok_or(SessionError::MissingConfig("webdriver-url"))?;
            tracing::info!("Connecting to WebDriver endpoint {}", endpoint);

            let options = WebDriverOptions {
                endpoint,
                browser: config.browser,
                headless: config.headless,
                page_timeout: Duration::from_millis(config.page_timeout_ms),
                origin_url: origin_url.to_string(),
                readiness,
            };
            Ok(Box::new(WebDriverSession::connect(options, &credentials).await?))
        }
    }
}
