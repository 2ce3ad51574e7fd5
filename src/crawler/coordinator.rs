//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates:
//! - Popping URLs from the frontier
//! - Rendering each page through the session
//! - Extracting component records and discovering links
//! - Handing records to the sink
//!
//! Only setup can fail the crawl. Once the loop is running every page, block
//! and record failure is logged and counted in the [`CrawlSummary`].

use super::extractor::Extractor;
use super::frontier::Frontier;
use super::links::discover_links;
use super::CrawlSummary;
use crate::config::Config;
use crate::output::{ComponentSink, SinkError};
use crate::session::{self, Credentials, Renderer, SessionError};
use crate::url::{normalize_url, ScopePrefix};
use crate::HarvestError;
use scraper::Html;
use std::time::{Duration, Instant};
use url::Url;

/// The parts of a crawler that depend only on the configuration
struct CrawlPlan {
    frontier: Frontier,
    extractor: Extractor,
    scope: ScopePrefix,
}

impl CrawlPlan {
    fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let extractor = Extractor::new(&config.extractor)?;

        // Seeds and scope take the same shape as discovered links so the
        // visited set and the scope check see one form of every URL
        let seeds = config
            .crawl
            .seed_urls
            .iter()
            .map(|seed| normalize_url(seed).map(String::from))
            .collect::<Result<Vec<_>, _>>()?;
        let scope = ScopePrefix::parse(&config.crawl.scope_prefix)?;

        Ok(Self {
            frontier: Frontier::with_seeds(&seeds),
            extractor,
            scope,
        })
    }
}

/// Main crawler structure, generic over the rendering backend
pub struct Crawler<R: Renderer> {
    renderer: R,
    frontier: Frontier,
    extractor: Extractor,
    scope: ScopePrefix,
    sink: ComponentSink,
    page_timeout: Duration,
    request_delay: Duration,
    max_pages: Option<u32>,
}

impl<R: Renderer> Crawler<R> {
    /// Creates a crawler seeded from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `renderer` - An established rendering session
    /// * `sink` - An opened output sink
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(HarvestError)` - A seed is malformed or a selector failed to compile
    pub fn new(config: &Config, renderer: R, sink: ComponentSink) -> Result<Self, HarvestError> {
        let plan = CrawlPlan::from_config(config)?;
        Ok(Self::from_plan(plan, config, renderer, sink))
    }

    fn from_plan(plan: CrawlPlan, config: &Config, renderer: R, sink: ComponentSink) -> Self {
        Self {
            renderer,
            frontier: plan.frontier,
            extractor: plan.extractor,
            scope: plan.scope,
            sink,
            page_timeout: Duration::from_millis(config.session.page_timeout_ms),
            request_delay: Duration::from_millis(config.crawl.request_delay_ms),
            max_pages: config.crawl.max_pages,
        }
    }

    /// Runs the crawl loop until the frontier is exhausted or the page cap hits
    pub async fn run(&mut self) -> CrawlSummary {
        tracing::info!(
            "Starting crawl of {} with {} seed(s)",
            self.scope.as_str(),
            self.frontier.len()
        );

        let mut summary = CrawlSummary::default();
        let start_time = Instant::now();
        let mut pages_attempted: u32 = 0;

        loop {
            if let Some(max_pages) = self.max_pages {
                if pages_attempted >= max_pages {
                    tracing::info!("Reached page cap of {}, stopping", max_pages);
                    summary.stopped_by_page_cap = true;
                    break;
                }
            }

            let url = match self.frontier.pop_next() {
                Some(url) => url,
                None => {
                    tracing::info!("Frontier is empty, crawl complete");
                    break;
                }
            };

            if pages_attempted > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            self.process_url(&url, &mut summary).await;
            pages_attempted += 1;

            if pages_attempted % 10 == 0 {
                let elapsed = start_time.elapsed();
                let rate = pages_attempted as f64 / elapsed.as_secs_f64();
                tracing::info!(
                    "Progress: {} pages crawled, {} components saved, {} in frontier, {:.2} pages/sec",
                    pages_attempted,
                    summary.records_saved,
                    self.frontier.len(),
                    rate
                );
            }
        }

        summary.frontier_remaining = self.frontier.len();

        tracing::info!(
            "Crawl completed: {} components from {} pages in {:?}",
            summary.records_saved,
            summary.pages_visited,
            start_time.elapsed()
        );

        summary
    }

    /// Processes a single URL
    ///
    /// This method:
    /// 1. Renders the page
    /// 2. Extracts component records and in-scope links
    /// 3. Pushes the links onto the frontier
    /// 4. Saves each record
    async fn process_url(&mut self, url: &str, summary: &mut CrawlSummary) {
        tracing::info!("Visiting: {}", url);

        let page = match self.renderer.render(url, self.page_timeout).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Error rendering {}: {}", url, e);
                summary.pages_failed += 1;
                return;
            }
        };

        summary.pages_visited += 1;
        if !page.ready {
            summary.pages_not_ready += 1;
        }

        let base_url = match Url::parse(&page.url).or_else(|_| Url::parse(url)) {
            Ok(base_url) => base_url,
            Err(e) => {
                tracing::error!("Cannot resolve links on {}: {}", url, e);
                return;
            }
        };

        // The parsed document is not Send; keep it out of any await
        let (extraction, links) = {
            let document = Html::parse_document(&page.html);
            (
                self.extractor.extract(&document, base_url.as_str()),
                discover_links(&document, &base_url, &self.scope),
            )
        };

        tracing::info!(
            "Found {} components and {} links on {}",
            extraction.records.len(),
            links.len(),
            url
        );

        summary.blocks_dropped += extraction.empty_blocks + extraction.failed_blocks;
        summary.links_discovered += links.len();
        self.frontier.push_many(links);

        for record in extraction.records {
            match self.sink.save(&record) {
                Ok(()) => {
                    tracing::info!("Saved component: {}", record.name);
                    summary.records_saved += 1;
                }
                Err(e @ SinkError::CorruptCollection { .. }) => {
                    tracing::error!(
                        "Not saving '{}': {}. Repair or move the file to resume saving",
                        record.name,
                        e
                    );
                    summary.records_failed += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to save component '{}': {}", record.name, e);
                    summary.records_failed += 1;
                }
            }
        }
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn sink(&self) -> &ComponentSink {
        &self.sink
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

/// Runs the main crawl operation
///
/// This function orchestrates the entire crawl process:
///
/// 1. Refuse anonymous credentials unless `allow-anonymous` is set
/// 2. Seed the frontier and compile the extractor
/// 3. Open the output sink (creating the directory)
/// 4. Establish the rendering session with the given credentials
/// 5. Run the crawl loop and release the session
///
/// Nothing fallible runs between connecting and releasing the session.
///
/// # Arguments
///
/// * `config` - The validated harvester configuration
/// * `credentials` - Session cookies and CSRF token
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The frontier was exhausted or the page cap reached
/// * `Err(HarvestError)` - Setup failed, including missing credentials
///
/// # Example
///
/// ```no_run
/// use component_harvester::config::load_config;
/// use component_harvester::crawler::run_crawl;
/// use component_harvester::session::Credentials;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_crawl(&config, Credentials::from_env()).await?;
/// println!("{} components saved", summary.records_saved);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    credentials: Credentials,
) -> Result<CrawlSummary, HarvestError> {
    if credentials.is_anonymous() {
        if !config.session.allow_anonymous {
            return Err(SessionError::MissingCredentials.into());
        }
        tracing::warn!("No session cookies configured, crawling anonymously");
    }

    let plan = CrawlPlan::from_config(config)?;

    let sink = ComponentSink::open(&config.output.output_dir)?;
    tracing::info!("Writing components to {}", sink.collection_path().display());

    let origin = config
        .crawl
        .seed_urls
        .first()
        .map(String::as_str)
        .unwrap_or(config.crawl.scope_prefix.as_str());
    let renderer = session::connect(&config.session, origin, credentials).await?;

    let mut crawler = Crawler::from_plan(plan, config, renderer, sink);
    let summary = crawler.run().await;

    if let Err(e) = crawler.renderer().shutdown().await {
        tracing::warn!("Failed to close session cleanly: {}", e);
    }

    Ok(summary)
}
