//! Authentication artifacts handed to a session at startup

use std::fmt;

/// Environment variable holding the session cookies (`name=value; name2=value2`)
pub const COOKIES_ENV: &str = "HARVEST_COOKIES";

/// Environment variable holding the CSRF token
pub const CSRF_TOKEN_ENV: &str = "HARVEST_CSRF_TOKEN";

/// Name of the cookie the CSRF token is installed under
pub const CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

/// A string that must never reach logs or output files
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

/// One cookie of the authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: Secret,
    pub http_only: bool,
}

/// Everything a session needs to look like a signed-in browser
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub cookies: Vec<SessionCookie>,
    pub csrf_token: Option<Secret>,
    pub user_agent: Option<String>,
}

impl Credentials {
    /// Reads credentials from `HARVEST_COOKIES` and `HARVEST_CSRF_TOKEN`
    ///
    /// Missing variables yield anonymous credentials. `run_crawl` refuses
    /// those unless `allow-anonymous` is set.
    pub fn from_env() -> Self {
        let cookies = std::env::var(COOKIES_ENV).ok();
        let csrf = std::env::var(CSRF_TOKEN_ENV).ok();
        Self::from_values(cookies.as_deref(), csrf.as_deref())
    }

    pub fn from_values(cookie_header: Option<&str>, csrf_token: Option<&str>) -> Self {
        let mut cookies = cookie_header.map(parse_cookie_header).unwrap_or_default();

        // A token given twice (cookie string and dedicated variable) keeps the dedicated one
        let csrf_token = csrf_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Secret::new);
        if csrf_token.is_some() {
            cookies.retain(|c| c.name != CSRF_COOKIE_NAME);
        }

        Self {
            cookies,
            csrf_token,
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.cookies.is_empty() && self.csrf_token.is_none()
    }

    /// All cookies to install, the CSRF token included
    pub fn all_cookies(&self) -> Vec<SessionCookie> {
        let mut cookies = self.cookies.clone();
        if let Some(token) = &self.csrf_token {
            cookies.push(SessionCookie {
                name: CSRF_COOKIE_NAME.to_string(),
                value: token.clone(),
                http_only: false,
            });
        }
        cookies
    }

    /// Builds a `Cookie` request header value, or `None` when there is nothing to send
    pub fn cookie_header(&self) -> Option<Secret> {
        let cookies = self.all_cookies();
        if cookies.is_empty() {
            return None;
        }

        let header = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value.expose()))
            .collect::<Vec<_>>()
            .join("; ");
        Some(Secret::new(header))
    }
}

/// Parses `name=value; name2=value2` into cookies, skipping malformed pairs
fn parse_cookie_header(header: &str) -> Vec<SessionCookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(SessionCookie {
                name: name.to_string(),
                value: Secret::new(value.trim()),
                http_only: name != CSRF_COOKIE_NAME,
            })
        })
        .collect()
}
