use crate::config::types::{
    Config, CrawlConfig, DriverKind, ExtractorConfig, OutputConfig, SessionConfig,
};
use crate::url::{normalize_url, ScopePrefix};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_session_config(&config.session)?;
    validate_output_config(&config.output)?;
    validate_extractor_config(&config.extractor)?;
    Ok(())
}

/// Validates seeds and scope
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.seed_urls.is_empty() {
        return Err(ConfigError::Validation(
            "seed-urls must contain at least one URL".to_string(),
        ));
    }

    validate_http_url("scope-prefix", &config.scope_prefix)?;
    let scope = ScopePrefix::parse(&config.scope_prefix).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid scope-prefix '{}': {}", config.scope_prefix, e))
    })?;

    for seed in &config.seed_urls {
        validate_http_url("seed URL", seed)?;
        let normalized = normalize_url(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        // A seed outside the scope would be crawled but none of its siblings would
        if !scope.contains(&normalized) {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' is outside scope-prefix '{}'",
                seed, config.scope_prefix
            )));
        }
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates rendering session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.page_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "page-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.readiness_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "readiness-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.driver == DriverKind::Webdriver {
        let endpoint = config.webdriver_url.as_deref().ok_or_else(|| {
            ConfigError::Validation("webdriver-url is required for driver 'webdriver'".to_string())
        })?;
        validate_http_url("webdriver-url", endpoint)?;
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be blank".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every selector compiles and the heuristics are usable
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    validate_selector("section-selector", &config.section_selector)?;
    validate_selector("heading-selector", &config.heading_selector)?;
    validate_selector("frame-selector", &config.frame_selector)?;
    validate_selector("code-selector", &config.code_selector)?;

    if config.code_tokens.is_empty() {
        return Err(ConfigError::Validation(
            "code-tokens must contain at least one token".to_string(),
        ));
    }

    if config.code_tokens.iter().any(|token| token.is_empty()) {
        return Err(ConfigError::Validation(
            "code-tokens cannot contain empty strings".to_string(),
        ));
    }

    if config.max_field_bytes == 0 {
        return Err(ConfigError::Validation(
            "max-field-bytes must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(field: &'static str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })?;
    Ok(())
}

/// Checks that a string is an absolute HTTP(S) URL with a host
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}
