//! W3C WebDriver session
//!
//! Drives a browser through an already-running WebDriver endpoint
//! (chromedriver, geckodriver, a Selenium grid). The browser executes the
//! site's scripts, so the snapshot reflects post-render DOM state.

use super::{Credentials, ReadinessProbe, RenderError, RenderedPage, Renderer, SessionError};
use crate::config::BrowserKind;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use url::Url;

/// Delay between readiness checks
const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Extra time granted to the HTTP call on top of the browser's own page-load timeout
const TRANSPORT_SLACK: Duration = Duration::from_secs(15);

/// Everything needed to open a WebDriver session
#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    pub endpoint: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub page_timeout: Duration,
    /// A page on the target site; cookies can only be set for the current origin
    pub origin_url: String,
    pub readiness: ReadinessProbe,
}

pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    session_id: String,
    readiness: ReadinessProbe,
}

/// Failure of a single WebDriver command
#[derive(Debug)]
enum WireError {
    Transport(reqwest::Error),
    Status { status: u16, body: String },
    Driver { error: String, message: String },
    Decode(String),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Status { status, body } => write!(f, "HTTP {}: {}", status, truncate(body, 240)),
            Self::Driver { error, message } => write!(f, "{}: {}", error, message),
            Self::Decode(message) => write!(f, "malformed response: {}", message),
        }
    }
}

impl WireError {
    fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Driver { error, .. } => error == "timeout",
            _ => false,
        }
    }
}

impl WebDriverSession {
    /// Opens a browser session and signs it in
    ///
    /// The session is created, given a page-load timeout, navigated to the
    /// origin of `options.origin_url` and loaded with every cookie from
    /// `credentials`. If any cookie is rejected the half-configured session is
    /// deleted before the error is returned.
    pub async fn connect(
        options: WebDriverOptions,
        credentials: &Credentials,
    ) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(options.page_timeout + TRANSPORT_SLACK)
            .build()?;
        let endpoint = options.endpoint.trim_end_matches('/').to_string();

        let capabilities = capabilities(
            options.browser,
            options.headless,
            credentials.user_agent.as_deref(),
        );
        let created = send(&client, Method::POST, &format!("{}/session", endpoint), Some(capabilities))
            .await
            .map_err(|e| SessionError::Establish(format!("session create failed: {}", e)))?;

        let session_id = created
            .pointer("/value/sessionId")
            .or_else(|| created.pointer("/sessionId"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SessionError::Establish("session id missing in response".to_string()))?;

        let session = Self {
            client,
            endpoint,
            session_id,
            readiness: options.readiness,
        };
        tracing::debug!("WebDriver session {} created", session.session_id);

        if let Err(e) = session.prepare(&options.origin_url, options.page_timeout, credentials).await {
            if let Err(cleanup) = session.shutdown().await {
                tracing::warn!("Failed to delete half-configured session: {}", cleanup);
            }
            return Err(e);
        }

        Ok(session)
    }

    async fn prepare(
        &self,
        origin_url: &str,
        page_timeout: Duration,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        self.command(
            Method::POST,
            "timeouts",
            Some(json!({ "pageLoad": page_timeout.as_millis() as u64 })),
        )
        .await
        .map_err(|e| SessionError::Establish(format!("setting timeouts failed: {}", e)))?;

        let cookies = credentials.all_cookies();
        if cookies.is_empty() {
            tracing::debug!("No cookies to install");
            return Ok(());
        }

        let origin = Url::parse(origin_url)
            .map_err(|e| SessionError::Establish(format!("invalid origin URL: {}", e)))?;
        let secure = origin.scheme() == "https";
        let origin_root = origin
            .join("/")
            .map_err(|e| SessionError::Establish(format!("invalid origin URL: {}", e)))?;

        self.command(Method::POST, "url", Some(json!({ "url": origin_root.as_str() })))
            .await
            .map_err(|e| SessionError::Establish(format!("navigation to origin failed: {}", e)))?;

        for cookie in &cookies {
            let body = json!({
                "cookie": {
                    "name": cookie.name,
                    "value": cookie.value.expose(),
                    "path": "/",
                    "secure": secure,
                    "httpOnly": cookie.http_only,
                }
            });
            // Names are safe to log, values never are
            self.command(Method::POST, "cookie", Some(body))
                .await
                .map_err(|e| {
                    SessionError::Establish(format!("cookie '{}' rejected: {}", cookie.name, e))
                })?;
        }

        tracing::info!("Installed {} session cookies", cookies.len());
        Ok(())
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WireError> {
        let url = format!("{}/session/{}/{}", self.endpoint, self.session_id, path);
        send(&self.client, method, &url, body).await
    }

    async fn execute(&self, script: &str) -> Result<Value, WireError> {
        let response = self
            .command(
                Method::POST,
                "execute/sync",
                Some(json!({ "script": script, "args": [] })),
            )
            .await?;
        Ok(response.get("value").cloned().unwrap_or(Value::Null))
    }

    /// Polls the readiness markers until one appears or the probe times out
    async fn wait_until_ready(&self, url: &str) -> bool {
        let script = self.readiness.script();
        let started = Instant::now();

        loop {
            match self.execute(&script).await {
                Ok(Value::Bool(true)) => return true,
                Ok(_) => {}
                Err(e) => tracing::debug!("Readiness check failed on {}: {}", url, e),
            }

            if started.elapsed() >= self.readiness.timeout() {
                tracing::info!(
                    "Readiness wait timed out after {:?} on {}, continuing",
                    self.readiness.timeout(),
                    url
                );
                return false;
            }

            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    async fn snapshot(&self, url: &str) -> Result<(String, String), RenderError> {
        let script = r#"
            return {
                url: window.location.href || "",
                html: document.documentElement ? document.documentElement.outerHTML : ""
            };
        "#;
        let value = self.execute(script).await.map_err(|e| RenderError::Snapshot {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let final_url = value
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .unwrap_or(url)
            .to_string();
        let html = value
            .get("html")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if html.is_empty() {
            return Err(RenderError::Snapshot {
                url: url.to_string(),
                message: "empty document".to_string(),
            });
        }

        Ok((final_url, html))
    }
}

#[async_trait]
impl Renderer for WebDriverSession {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError> {
        let navigation = self.command(Method::POST, "url", Some(json!({ "url": url })));
        match tokio::time::timeout(timeout + TRANSPORT_SLACK, navigation).await {
            Err(_) => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(RenderError::Timeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(_)) => {}
        }

        let ready = self.wait_until_ready(url).await;
        let (final_url, html) = self.snapshot(url).await?;

        Ok(RenderedPage {
            url: final_url,
            html,
            ready,
        })
    }

    async fn shutdown(&self) -> Result<(), SessionError> {
        let url = format!("{}/session/{}", self.endpoint, self.session_id);
        self.client.delete(url).send().await?;
        tracing::debug!("WebDriver session {} deleted", self.session_id);
        Ok(())
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, WireError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(WireError::Transport)?;
    let status = response.status();
    let text = response.text().await.map_err(WireError::Transport)?;

    // Drivers report command failures as JSON error objects, usually with a 4xx/5xx status
    let value: Option<Value> = serde_json::from_str(&text).ok();
    if let Some(error) = value
        .as_ref()
        .and_then(|v| v.pointer("/value/error"))
        .and_then(Value::as_str)
    {
        let message = value
            .as_ref()
            .and_then(|v| v.pointer("/value/message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown webdriver error");
        return Err(WireError::Driver {
            error: error.to_string(),
            message: message.to_string(),
        });
    }

    if !status.is_success() {
        return Err(WireError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    value.ok_or_else(|| WireError::Decode(truncate(&text, 120)))
}

/// Session capabilities for the requested browser
fn capabilities(browser: BrowserKind, headless: bool, user_agent: Option<&str>) -> Value {
    match browser {
        BrowserKind::Firefox => {
            let mut args = Vec::<String>::new();
            if headless {
                args.push("-headless".to_string());
            }
            let mut firefox_options = json!({ "args": args });
            if let Some(agent) = user_agent {
                firefox_options["prefs"] = json!({ "general.useragent.override": agent });
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "firefox",
                        "moz:firefoxOptions": firefox_options
                    }
                }
            })
        }
        BrowserKind::Chrome => {
            let mut args = Vec::<String>::new();
            if headless {
                args.push("--headless=new".to_string());
            }
            args.push("--window-size=1920,1080".to_string());
            args.push("--disable-gpu".to_string());
            args.push("--disable-dev-shm-usage".to_string());
            if let Some(agent) = user_agent {
                args.push(format!("--user-agent={}", agent));
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "goog:chromeOptions": { "args": args }
                    }
                }
            })
        }
    }
}

fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect::<String>() + "..."
}
