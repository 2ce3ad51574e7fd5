//! Component extraction
//!
//! Carves a rendered page into candidate blocks and turns each qualifying
//! block into a [`ComponentRecord`]:
//!
//! - **name**: text of the first heading in the block, or a placeholder
//! - **markup variant**: the `srcdoc` of the first preview frame
//! - **code variant**: the *last* code block mentioning an import/export token;
//!   earlier snippets on these pages are usually install commands or partial
//!   excerpts, the full component source comes last
//!
//! Blocks are independent. A block that yields neither variant is skipped
//! quietly; a block that fails (see [`BlockError`]) is dropped with a warning.
//! Neither stops the remaining blocks from being read.

use crate::config::ExtractorConfig;
use crate::record::ComponentRecord;
use crate::ConfigError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Why a single block was dropped
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("{field} of block {index} is {bytes} bytes, over the {limit} byte limit")]
    Oversized {
        index: usize,
        field: &'static str,
        bytes: usize,
        limit: usize,
    },
}

/// Outcome of extracting one page
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ComponentRecord>,

    /// Blocks with neither markup nor code
    pub empty_blocks: usize,

    /// Blocks dropped because of a [`BlockError`]
    pub failed_blocks: usize,
}

impl Extraction {
    pub fn block_count(&self) -> usize {
        self.records.len() + self.empty_blocks + self.failed_blocks
    }
}

pub struct Extractor {
    sections: Selector,
    heading: Selector,
    frame: Selector,
    code: Selector,
    code_tokens: Vec<String>,
    max_field_bytes: usize,
}

impl Extractor {
    /// Compiles the configured selectors
    pub fn new(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            sections: compile("section-selector", &config.section_selector)?,
            heading: compile("heading-selector", &config.heading_selector)?,
            frame: compile("frame-selector", &config.frame_selector)?,
            code: compile("code-selector", &config.code_selector)?,
            code_tokens: config.code_tokens.clone(),
            max_field_bytes: config.max_field_bytes,
        })
    }

    /// Extracts every component record found on a page
    ///
    /// # Arguments
    ///
    /// * `page` - The parsed, rendered document
    /// * `page_url` - Absolute URL stored as each record's source
    pub fn extract(&self, page: &Html, page_url: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for (index, block) in page.select(&self.sections).enumerate() {
            match self.extract_block(index, block, page_url) {
                Ok(Some(record)) => extraction.records.push(record),
                Ok(None) => {
                    tracing::debug!("Block {} on {} has no markup or code", index, page_url);
                    extraction.empty_blocks += 1;
                }
                Err(e) => {
                    tracing::warn!("Dropping block on {}: {}", page_url, e);
                    extraction.failed_blocks += 1;
                }
            }
        }

        extraction
    }

    /// Reads one block into a record
    ///
    /// Returns `Ok(None)` when the block carries neither variant.
    pub fn extract_block(
        &self,
        index: usize,
        block: ElementRef<'_>,
        page_url: &str,
    ) -> Result<Option<ComponentRecord>, BlockError> {
        let name = block
            .select(&self.heading)
            .next()
            .map(|heading| heading.text().collect::<String>())
            .unwrap_or_default();

        let markup = block
            .select(&self.frame)
            .next()
            .and_then(|frame| frame.value().attr("srcdoc"))
            .unwrap_or_default()
            .to_string();
        self.check_size(index, "markup", &markup)?;

        let code = self.select_code(block);
        self.check_size(index, "code", &code)?;

        Ok(ComponentRecord::new(name, page_url, markup, code, Utc::now()))
    }

    /// Returns the text of the last code block containing a code token
    fn select_code(&self, block: ElementRef<'_>) -> String {
        let mut selected = String::new();

        for code_block in block.select(&self.code) {
            let text = code_block.text().collect::<String>();
            if self.code_tokens.iter().any(|token| text.contains(token.as_str())) {
                selected = text;
            }
        }

        selected
    }

    fn check_size(&self, index: usize, field: &'static str, value: &str) -> Result<(), BlockError> {
        if value.len() > self.max_field_bytes {
            return Err(BlockError::Oversized {
                index,
                field,
                bytes: value.len(),
                limit: self.max_field_bytes,
            });
        }
        Ok(())
    }
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}
