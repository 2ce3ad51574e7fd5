//! The component record produced by the extractor and stored by the sink

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name used when a section carries no heading
pub const UNNAMED_COMPONENT: &str = "Unnamed Component";

/// One extracted UI example
///
/// Records are created by the extractor, handed straight to the sink and
/// never mutated afterwards. The legacy aliases let collections written by
/// the earlier scraper (`url`, `htmlCode`, `reactCode`, `timestamp`) load
/// without conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    /// Heading text of the section, never empty
    pub name: String,

    /// Absolute URL of the page the section was found on
    #[serde(alias = "url")]
    pub source_url: String,

    /// Inline document of the preview frame, possibly empty
    #[serde(alias = "htmlCode", default)]
    pub markup_variant: String,

    /// Selected source snippet, possibly empty
    #[serde(alias = "reactCode", default)]
    pub code_variant: String,

    /// When the section was extracted
    #[serde(alias = "timestamp")]
    pub extracted_at: DateTime<Utc>,
}

impl ComponentRecord {
    /// Builds a record, returning `None` when both variants are empty
    ///
    /// An empty or whitespace-only name falls back to [`UNNAMED_COMPONENT`].
    pub fn new(
        name: impl Into<String>,
        source_url: impl Into<String>,
        markup_variant: impl Into<String>,
        code_variant: impl Into<String>,
        extracted_at: DateTime<Utc>,
    ) -> Option<Self> {
        let markup_variant = markup_variant.into();
        let code_variant = code_variant.into();
        if markup_variant.is_empty() && code_variant.is_empty() {
            return None;
        }

        let name = name.into();
        let name = match name.trim() {
            "" => UNNAMED_COMPONENT.to_string(),
            trimmed => trimmed.to_string(),
        };

        Some(Self {
            name,
            source_url: source_url.into(),
            markup_variant,
            code_variant,
            extracted_at,
        })
    }

    pub fn has_markup(&self) -> bool {
        !self.markup_variant.is_empty()
    }

    pub fn has_code(&self) -> bool {
        !self.code_variant.is_empty()
    }
}
