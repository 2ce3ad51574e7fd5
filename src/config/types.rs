use serde::Deserialize;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Crawl scope and pacing
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Absolute URLs the crawl starts from
    #[serde(rename = "seed-urls")]
    pub seed_urls: Vec<String>,

    /// Discovered links are followed only if they start with this prefix
    #[serde(rename = "scope-prefix")]
    pub scope_prefix: String,

    /// Stop after this many pages have been dequeued
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Pause between consecutive page renders (milliseconds)
    #[serde(rename = "request-delay-ms", default)]
    pub request_delay_ms: u64,
}

/// Which rendering backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// A running W3C WebDriver endpoint (chromedriver, geckodriver)
    Webdriver,
    /// Plain HTTP fetches without script execution
    Http,
}

/// Browser requested from the WebDriver endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

/// Rendering session configuration
///
/// Cookies and the CSRF token are deliberately absent; they are read from the
/// environment so they never end up in a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub driver: DriverKind,

    /// WebDriver endpoint, required for the `webdriver` driver
    #[serde(rename = "webdriver-url", default)]
    pub webdriver_url: Option<String>,

    #[serde(default)]
    pub browser: BrowserKind,

    #[serde(default = "default_headless")]
    pub headless: bool,

    /// User-Agent presented to the site
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Navigation timeout handed to the renderer (milliseconds)
    #[serde(rename = "page-timeout-ms", default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Bound on the post-navigation wait for content markers (milliseconds)
    #[serde(
        rename = "readiness-timeout-ms",
        default = "default_readiness_timeout_ms"
    )]
    pub readiness_timeout_ms: u64,

    /// Crawl without cookies or a CSRF token instead of refusing to start
    #[serde(rename = "allow-anonymous", default)]
    pub allow_anonymous: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding `components.json` and `components.txt`
    #[serde(rename = "output-dir")]
    pub output_dir: String,
}

/// Selectors and heuristics used to carve pages into component records
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    #[serde(rename = "section-selector", default = "default_section_selector")]
    pub section_selector: String,

    #[serde(rename = "heading-selector", default = "default_heading_selector")]
    pub heading_selector: String,

    #[serde(rename = "frame-selector", default = "default_frame_selector")]
    pub frame_selector: String,

    #[serde(rename = "code-selector", default = "default_code_selector")]
    pub code_selector: String,

    /// A code block qualifies as component source if it contains any of these
    #[serde(rename = "code-tokens", default = "default_code_tokens")]
    pub code_tokens: Vec<String>,

    /// Largest markup or code field accepted from a single block (bytes)
    #[serde(rename = "max-field-bytes", default = "default_max_field_bytes")]
    pub max_field_bytes: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            section_selector: default_section_selector(),
            heading_selector: default_heading_selector(),
            frame_selector: default_frame_selector(),
            code_selector: default_code_selector(),
            code_tokens: default_code_tokens(),
            max_field_bytes: default_max_field_bytes(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_page_timeout_ms() -> u64 {
    60_000
}

fn default_readiness_timeout_ms() -> u64 {
    10_000
}

fn default_section_selector() -> String {
    "section".to_string()
}

fn default_heading_selector() -> String {
    "h1, h2, h3, h4, h5, h6".to_string()
}

fn default_frame_selector() -> String {
    "iframe".to_string()
}

fn default_code_selector() -> String {
    "pre code".to_string()
}

fn default_code_tokens() -> Vec<String> {
    vec!["import".to_string(), "export".to_string()]
}

fn default_max_field_bytes() -> usize {
    1024 * 1024
}
