//! Value formatting
//!
//! Formatting never fails: a value that does not parse for a numeric kind
//! is shown verbatim with its suffix.

use serde::{Deserialize, Serialize};

use crate::threshold::parse_number;

/// How a cell renders its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueFormat {
    /// Truncate towards zero
    #[serde(rename = "int")]
    Int,
    /// Round to a whole number
    #[serde(rename = "0f", alias = "fixed0")]
    Fixed0,
    /// Round to one decimal place
    #[default]
    #[serde(rename = "1f", alias = "fixed1")]
    Fixed1,
    /// Show the value as received
    #[serde(rename = "raw")]
    Raw,
}

/// Format `value` for display and append `suffix`
pub fn format_value(value: &str, format: ValueFormat, suffix: &str) -> String {
    let number = match format {
        ValueFormat::Raw => None,
        _ => parse_number(value).filter(|n| n.is_finite()),
    };

    match (format, number) {
        // Adding zero folds -0 into 0
        (ValueFormat::Int, Some(n)) => format!("{:.0}{suffix}", n.trunc() + 0.0),
        (ValueFormat::Fixed0, Some(n)) => format!("{n:.0}{suffix}"),
        (ValueFormat::Fixed1, Some(n)) => format!("{n:.1}{suffix}"),
        _ => format!("{value}{suffix}"),
    }
}
