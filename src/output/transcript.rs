//! Human-readable transcript entries

use crate::record::ComponentRecord;
use chrono::SecondsFormat;

/// Shown in place of an empty variant
const NOT_AVAILABLE: &str = "Not available";

const SEPARATOR: &str = "----------------------------------------";

/// Formats one record as a transcript block
///
/// Each block opens with a blank line and closes with the separator line.
pub fn format_entry(record: &ComponentRecord) -> String {
    let mut entry = String::new();

    entry.push('\n');
    entry.push_str(&format!("Component: {}\n", record.name));
    entry.push_str(&format!("Source: {}\n", record.source_url));
    entry.push_str(&format!(
        "Timestamp: {}\n\n",
        record
            .extracted_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    ));

    entry.push_str("HTML Version:\n");
    entry.push_str(or_not_available(&record.markup_variant));
    entry.push_str("\n\n");

    entry.push_str("React Version:\n");
    entry.push_str(or_not_available(&record.code_variant));
    entry.push_str("\n\n");

    entry.push_str(SEPARATOR);
    entry.push('\n');
    entry
}

fn or_not_available(value: &str) -> &str {
    if value.is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}
