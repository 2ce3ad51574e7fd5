//! Component Harvester main entry point
//!
//! This is the command-line interface for the component-library crawler.

use anyhow::Context;
use clap::Parser;
use component_harvester::config::{load_config_with_hash, Config, DriverKind};
use component_harvester::crawler::run_crawl;
use component_harvester::output::{
    load_collection, print_statistics, print_summary, CollectionStatistics, COLLECTION_FILE,
};
use component_harvester::session::Credentials;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Component Harvester: an authenticated component-library crawler
///
/// Walks a component-library site through a rendering session, extracts one
/// record per component example, and appends each record to a JSON
/// collection and a readable transcript.
///
/// Session cookies and the CSRF token are read from HARVEST_COOKIES and
/// HARVEST_CSRF_TOKEN, optionally via a .env file.
#[derive(Parser, Debug)]
#[command(name = "component-harvester")]
#[command(version = "1.0.0")]
#[command(about = "An authenticated component-library crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the saved collection and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // A missing .env file is fine; the variables may come from the shell
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("component_harvester=info,warn"),
            1 => EnvFilter::new("component_harvester=debug,info"),
            2 => EnvFilter::new("component_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Component Harvester Dry Run ===\n");

    println!("Crawl:");
    println!("  Scope prefix: {}", config.crawl.scope_prefix);
    match config.crawl.max_pages {
        Some(max_pages) => println!("  Max pages: {}", max_pages),
        None => println!("  Max pages: unlimited"),
    }
    println!("  Request delay: {}ms", config.crawl.request_delay_ms);

    println!("\nSeed URLs ({}):", config.crawl.seed_urls.len());
    for seed in &config.crawl.seed_urls {
        println!("  - {}", seed);
    }

    println!("\nSession:");
    match config.session.driver {
        DriverKind::Webdriver => {
            println!("  Driver: webdriver");
            if let Some(endpoint) = &config.session.webdriver_url {
                println!("  Endpoint: {}", endpoint);
            }
            println!("  Browser: {:?}", config.session.browser);
            println!("  Headless: {}", config.session.headless);
        }
        DriverKind::Http => println!("  Driver: http"),
    }
    println!("  Page timeout: {}ms", config.session.page_timeout_ms);
    println!("  Readiness timeout: {}ms", config.session.readiness_timeout_ms);

    let credentials = Credentials::from_env();
    println!(
        "  Cookies: {} configured, CSRF token {}",
        credentials.cookies.len(),
        if credentials.csrf_token.is_some() {
            "present"
        } else {
            "absent"
        }
    );
    if credentials.is_anonymous() && !config.session.allow_anonymous {
        println!("  ✗ No credentials found; the crawl would refuse to start");
    } else if credentials.is_anonymous() {
        println!("  Anonymous crawling: allowed");
    }

    println!("\nExtractor:");
    println!("  Sections: {}", config.extractor.section_selector);
    println!("  Headings: {}", config.extractor.heading_selector);
    println!("  Frames: {}", config.extractor.frame_selector);
    println!("  Code: {}", config.extractor.code_selector);
    println!("  Code tokens: {}", config.extractor.code_tokens.join(", "));

    println!("\nOutput:");
    println!("  Directory: {}", config.output.output_dir);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.crawl.seed_urls.len()
    );
}

/// Handles the --stats mode: shows statistics for the saved collection
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.output.output_dir).join(COLLECTION_FILE);
    println!("Collection: {}\n", path.display());

    let records = load_collection(&path)?;
    print_statistics(&CollectionStatistics::from_records(&records));

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Seed URLs: {}, scope: {}",
        config.crawl.seed_urls.len(),
        config.crawl.scope_prefix
    );

    let credentials = Credentials::from_env();

    match run_crawl(config, credentials).await {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
