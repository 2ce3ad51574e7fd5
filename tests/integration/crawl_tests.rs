//! Integration tests for the harvester
//!
//! The crawl loop is driven through a canned renderer; the HTTP and WebDriver
//! sessions are exercised against wiremock servers.

use async_trait::async_trait;
use component_harvester::config::{
    BrowserKind, Config, CrawlConfig, DriverKind, ExtractorConfig, OutputConfig, SessionConfig,
};
use component_harvester::crawler::{run_crawl, Crawler};
use component_harvester::output::{load_collection, ComponentSink, COLLECTION_FILE};
use component_harvester::session::{
    Credentials, HttpSession, ReadinessProbe, RenderError, RenderedPage, Renderer, SessionError,
    WebDriverOptions, WebDriverSession,
};
use component_harvester::HarvestError;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCOPE: &str = "https://example.com/components";

/// Page with a preview-frame section and a three-code-block section
const COMPONENTS_PAGE: &str = r##"<html><body>
    <nav>
        <a href="/components/forms">Forms</a>
        <a href="/pricing">Pricing</a>
        <a href="#toggle">Jump to toggle</a>
    </nav>
    <section>
        <h2>Stacked form</h2>
        <div role="tabpanel">
            <iframe srcdoc="<form><input type=&quot;email&quot;></form>"></iframe>
        </div>
    </section>
    <section id="toggle">
        <h2>Toggle</h2>
        <pre><code>npm install @headlessui/react</code></pre>
        <pre><code>const [enabled, setEnabled] = useState(false)</code></pre>
        <pre><code>export default function Toggle() { return null }</code></pre>
    </section>
</body></html>"##;

/// Renderer returning canned documents and recording every call
#[derive(Default)]
struct FakeRenderer {
    pages: HashMap<String, String>,
    not_ready: HashSet<String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRenderer {
    fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    fn with_unready_page(mut self, url: &str, html: &str) -> Self {
        self.not_ready.insert(url.to_string());
        self.with_page(url, html)
    }

    fn with_failure(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<RenderedPage, RenderError> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.failing.contains(url) {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }

        let html = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string());

        Ok(RenderedPage {
            url: url.to_string(),
            html,
            ready: !self.not_ready.contains(url),
        })
    }
}

/// Creates a test configuration writing into `output_dir`
fn create_test_config(seeds: &[&str], scope: &str, output_dir: &Path) -> Config {
    Config {
        crawl: CrawlConfig {
            seed_urls: seeds.iter().map(|s| s.to_string()).collect(),
            scope_prefix: scope.to_string(),
            max_pages: None,
            request_delay_ms: 0,
        },
        session: SessionConfig {
            driver: DriverKind::Http,
            webdriver_url: None,
            browser: BrowserKind::Chrome,
            headless: true,
            user_agent: Some("HarvesterTest/1.0".to_string()),
            page_timeout_ms: 5_000,
            readiness_timeout_ms: 1_000,
            allow_anonymous: false,
        },
        output: OutputConfig {
            output_dir: output_dir.to_string_lossy().into_owned(),
        },
        extractor: ExtractorConfig::default(),
    }
}

fn crawler(config: &Config, renderer: FakeRenderer) -> Crawler<FakeRenderer> {
    let sink = ComponentSink::open(&config.output.output_dir).expect("Failed to open sink");
    Crawler::new(config, renderer, sink).expect("Failed to create crawler")
}

#[tokio::test]
async fn test_end_to_end_single_page() {
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&[SCOPE], SCOPE, temp.path());
    let renderer = FakeRenderer::default().with_page(SCOPE, COMPONENTS_PAGE);

    let mut crawler = crawler(&config, renderer);
    let summary = crawler.run().await;

    // Two records, in document order
    let records = load_collection(&temp.path().join(COLLECTION_FILE)).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].name, "Stacked form");
    assert_eq!(records[0].markup_variant, r#"<form><input type="email"></form>"#);
    assert!(records[0].code_variant.is_empty());
    assert_eq!(records[0].source_url, SCOPE);

    assert_eq!(records[1].name, "Toggle");
    assert!(records[1].markup_variant.is_empty());
    assert_eq!(
        records[1].code_variant,
        "export default function Toggle() { return null }"
    );

    // Exactly one new in-scope URL was discovered and then visited
    assert_eq!(summary.links_discovered, 1);
    assert_eq!(
        crawler.renderer().calls(),
        vec![SCOPE.to_string(), format!("{}/forms", SCOPE)]
    );

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.records_saved, 2);
    assert_eq!(summary.frontier_remaining, 0);
    assert!(!summary.stopped_by_page_cap);

    let transcript = std::fs::read_to_string(crawler.sink().transcript_path()).unwrap();
    assert!(transcript.contains("Component: Stacked form"));
    assert!(transcript.contains("Component: Toggle"));
}

#[tokio::test]
async fn test_render_failure_does_not_stop_crawl() {
    let temp = TempDir::new().unwrap();
    let seeds = [
        "https://example.com/components/a",
        "https://example.com/components/b",
        "https://example.com/components/c",
    ];
    let config = create_test_config(&seeds, SCOPE, temp.path());
    let renderer = FakeRenderer::default()
        .with_page(seeds[0], r#"<section><h2>A</h2><iframe srcdoc="<p>a</p>"></iframe></section>"#)
        .with_failure(seeds[1])
        .with_page(seeds[2], r#"<section><h2>C</h2><iframe srcdoc="<p>c</p>"></iframe></section>"#);

    let mut crawler = crawler(&config, renderer);
    let summary = crawler.run().await;

    assert_eq!(crawler.renderer().calls(), seeds.to_vec());
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_failed, 1);

    let names: Vec<_> = load_collection(&temp.path().join(COLLECTION_FILE))
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["A", "C"]);
}

#[tokio::test]
async fn test_block_without_content_yields_nothing() {
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&[SCOPE], SCOPE, temp.path());
    let renderer = FakeRenderer::default().with_page(
        SCOPE,
        r#"<html><body><section><p>Just prose, no heading or preview</p></section></body></html>"#,
    );

    let mut crawler = crawler(&config, renderer);
    let summary = crawler.run().await;

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.records_saved, 0);
    assert_eq!(summary.blocks_dropped, 1);
    assert!(!temp.path().join(COLLECTION_FILE).exists());
}

#[tokio::test]
async fn test_empty_and_oversized_blocks_are_counted() {
    let temp = TempDir::new().unwrap();
    let mut config = create_test_config(&[SCOPE], SCOPE, temp.path());
    config.extractor.max_field_bytes = 64;

    let oversized = format!("export const Big = \"{}\"", "x".repeat(128));
    let page = format!(
        r#"<section><p>No heading, no preview</p></section>
           <section><h2>Big</h2><pre><code>{}</code></pre></section>
           <section><h2>Small</h2><pre><code>export const Small = 1</code></pre></section>"#,
        oversized
    );
    let renderer = FakeRenderer::default().with_page(SCOPE, &page);

    let mut crawler = crawler(&config, renderer);
    let summary = crawler.run().await;

    assert_eq!(summary.records_saved, 1);
    assert_eq!(summary.blocks_dropped, 2);
}

#[tokio::test]
async fn test_newest_links_are_explored_first() {
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&[SCOPE], SCOPE, temp.path());
    let renderer = FakeRenderer::default()
        .with_page(
            SCOPE,
            r#"<a href="/components/a">A</a><a href="/components/b">B</a>"#,
        )
        .with_page(
            "https://example.com/components/b",
            r#"<a href="/components/b/detail">Detail</a><a href="/components">Back</a>"#,
        );

    let mut crawler = crawler(&config, renderer);
    crawler.run().await;

    assert_eq!(
        crawler.renderer().calls(),
        vec![
            SCOPE,
            "https://example.com/components/b",
            "https://example.com/components/b/detail",
            "https://example.com/components/a",
        ]
    );
}

#[tokio::test]
async fn test_page_cap_stops_crawl() {
    let temp = TempDir::new().unwrap();
    let mut config = create_test_config(&[SCOPE], SCOPE, temp.path());
    config.crawl.max_pages = Some(2);

    let links: String = (1..=5)
        .map(|i| format!(r#"<a href="/components/{}">{}</a>"#, i, i))
        .collect();
    let renderer = FakeRenderer::default().with_page(SCOPE, &links);

    let mut crawler = crawler(&config, renderer);
    let summary = crawler.run().await;

    assert_eq!(crawler.renderer().calls().len(), 2);
    assert!(summary.stopped_by_page_cap);
    assert_eq!(summary.frontier_remaining, 4);
}

#[tokio::test]
async fn test_unready_page_is_still_extracted() {
    let temp = TempDir::new().unwrap();
    let config = create_test_config(&[SCOPE], SCOPE, temp.path());
    let renderer = FakeRenderer::default().with_unready_page(
        SCOPE,
        r#"<section><h2>Late</h2><pre><code>export const Late = 1</code></pre></section>"#,
    );

    let mut crawler = crawler(&config, renderer);
    let summary = crawler.run().await;

    assert_eq!(summary.pages_not_ready, 1);
    assert_eq!(summary.records_saved, 1);
}

#[tokio::test]
async fn test_corrupt_collection_is_preserved() {
    let temp = TempDir::new().unwrap();
    let collection = temp.path().join(COLLECTION_FILE);
    std::fs::write(&collection, "not a json array").unwrap();

    let config = create_test_config(&[SCOPE], SCOPE, temp.path());
    let renderer = FakeRenderer::default().with_page(SCOPE, COMPONENTS_PAGE);

    let mut crawler = crawler(&config, renderer);
    let summary = crawler.run().await;

    // The crawl carries on, every save fails, and the file is untouched
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.records_saved, 0);
    assert_eq!(summary.records_failed, 2);
    assert_eq!(std::fs::read_to_string(&collection).unwrap(), "not a json array");
}

#[tokio::test]
async fn test_http_session_sends_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/components"))
        .and(header("cookie", "ui_session=abc; XSRF-TOKEN=tok"))
        .and(header("x-xsrf-token", "tok"))
        .and(header("user-agent", "HarvesterTest/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(COMPONENTS_PAGE)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = Credentials::from_values(Some("ui_session=abc"), Some("tok"))
        .with_user_agent("HarvesterTest/1.0");
    let session = HttpSession::new(
        &credentials,
        ReadinessProbe::new(Duration::from_secs(1)),
    )
    .expect("Failed to build session");

    let url = format!("{}/components", mock_server.uri());
    let page = session
        .render(&url, Duration::from_secs(5))
        .await
        .expect("Render failed");

    assert_eq!(page.url, url);
    assert!(page.ready);
    assert!(page.html.contains("Stacked form"));
}

#[tokio::test]
async fn test_http_session_reports_status_and_readiness() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/components/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/components/skeleton"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><div class="skeleton"></div></body></html>"#),
        )
        .mount(&mock_server)
        .await;

    let session = HttpSession::new(
        &Credentials::default(),
        ReadinessProbe::new(Duration::from_secs(1)),
    )
    .unwrap();

    let missing = session
        .render(
            &format!("{}/components/missing", mock_server.uri()),
            Duration::from_secs(5),
        )
        .await;
    assert!(matches!(missing, Err(RenderError::Status { status: 404, .. })));

    let skeleton = session
        .render(
            &format!("{}/components/skeleton", mock_server.uri()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert!(!skeleton.ready);
}

#[tokio::test]
async fn test_run_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/components"))
        .and(header("x-xsrf-token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/components/buttons">Buttons</a>
                <a href="/blog">Blog</a>
                <section><h2>Alert</h2><iframe srcdoc="<div>Alert</div>"></iframe></section>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/components/buttons"))
        .and(header("x-xsrf-token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <section><h3>Primary button</h3><pre><code>export function Button() {}</code></pre></section>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let seed = format!("{}/components", base_url);
    let config = create_test_config(&[seed.as_str()], &seed, &temp.path().join("out"));
    let credentials = Credentials::from_values(Some("ui_session=abc"), Some("tok"));

    let summary = run_crawl(&config, credentials).await.expect("Crawl failed");

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.records_saved, 2);

    let records = load_collection(&temp.path().join("out").join(COLLECTION_FILE)).unwrap();
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alert", "Primary button"]);
    assert_eq!(records[1].source_url, format!("{}/components/buttons", base_url));
}

#[tokio::test]
async fn test_webdriver_session_round_trip() {
    let mock_server = MockServer::start().await;
    let null_value = serde_json::json!({ "value": null });

    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_string_contains("goog:chromeOptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": { "sessionId": "s-1", "capabilities": {} }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-1/timeouts"))
        .and(body_string_contains("pageLoad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Origin navigation before the cookies, then the page itself
    Mock::given(method("POST"))
        .and(path("/session/s-1/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value.clone()))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-1/cookie"))
        .and(body_string_contains("ui_session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-1/cookie"))
        .and(body_string_contains("XSRF-TOKEN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-1/execute/sync"))
        .and(body_string_contains("querySelector"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": true })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-1/execute/sync"))
        .and(body_string_contains("outerHTML"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": {
                "url": "https://example.com/components/forms",
                "html": COMPONENTS_PAGE
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/session/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = WebDriverOptions {
        endpoint: mock_server.uri(),
        browser: BrowserKind::Chrome,
        headless: true,
        page_timeout: Duration::from_secs(5),
        origin_url: "https://example.com/components".to_string(),
        readiness: ReadinessProbe::new(Duration::from_secs(1)),
    };
    let credentials = Credentials::from_values(Some("ui_session=abc"), Some("tok"));

    let session = WebDriverSession::connect(options, &credentials)
        .await
        .expect("Failed to connect");

    let page = session
        .render("https://example.com/components/forms", Duration::from_secs(5))
        .await
        .expect("Render failed");

    assert!(page.ready);
    assert_eq!(page.url, "https://example.com/components/forms");
    assert!(page.html.contains("Stacked form"));

    session.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_webdriver_rejected_cookie_deletes_session() {
    let mock_server = MockServer::start().await;
    let null_value = serde_json::json!({ "value": null });

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": { "sessionId": "s-2", "capabilities": {} }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-2/timeouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value.clone()))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-2/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value.clone()))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/s-2/cookie"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "value": { "error": "unable to set cookie", "message": "domain mismatch" }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/session/s-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(null_value))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = WebDriverOptions {
        endpoint: mock_server.uri(),
        browser: BrowserKind::Firefox,
        headless: true,
        page_timeout: Duration::from_secs(5),
        origin_url: "https://example.com/components".to_string(),
        readiness: ReadinessProbe::new(Duration::from_secs(1)),
    };
    let credentials = Credentials::from_values(Some("ui_session=abc"), None);

    let result = WebDriverSession::connect(options, &credentials).await;
    let err = result.err().expect("Connect should fail");

    let message = err.to_string();
    assert!(message.contains("ui_session"));
    assert!(!message.contains("abc"));
}

#[tokio::test]
async fn test_run_crawl_refuses_missing_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Please sign in</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let output_dir = temp.path().join("out");
    let seed = format!("{}/components", mock_server.uri());
    let config = create_test_config(&[seed.as_str()], &seed, &output_dir);

    let result = run_crawl(&config, Credentials::default()).await;

    assert!(matches!(
        result,
        Err(HarvestError::Session(SessionError::MissingCredentials))
    ));
    assert!(!output_dir.exists());
}

#[tokio::test]
async fn test_run_crawl_anonymous_when_allowed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/components"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<section><h2>Badge</h2><iframe srcdoc="<span>New</span>"></iframe></section>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let seed = format!("{}/components", mock_server.uri());
    let mut config = create_test_config(&[seed.as_str()], &seed, temp.path());
    config.session.allow_anonymous = true;

    let summary = run_crawl(&config, Credentials::default())
        .await
        .expect("Anonymous crawl should be allowed");

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.records_saved, 1);
}

#[tokio::test]
async fn test_run_crawl_with_mixed_case_scope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/components"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/components/forms">Forms</a>"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/components/forms"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Forms</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let seed = format!(
        "http://LOCALHOST:{}/components",
        mock_server.address().port()
    );
    let config = create_test_config(&[seed.as_str()], &seed, temp.path());
    let credentials = Credentials::from_values(Some("ui_session=abc"), None);

    let summary = run_crawl(&config, credentials).await.expect("Crawl failed");

    assert_eq!(summary.links_discovered, 1);
    assert_eq!(summary.pages_visited, 2);
}

#[tokio::test]
async fn test_run_crawl_setup_error_opens_no_webdriver_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": { "sessionId": "s-3", "capabilities": {} }
        })))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = create_test_config(&["not a url"], SCOPE, temp.path());
    config.session.driver = DriverKind::Webdriver;
    config.session.webdriver_url = Some(mock_server.uri());
    let credentials = Credentials::from_values(Some("ui_session=abc"), None);

    let result = run_crawl(&config, credentials).await;

    assert!(matches!(result, Err(HarvestError::UrlError(_))));
}
