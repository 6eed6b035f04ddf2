//! Structured error types for the reconciliation pipeline.
//!
//! Few things here are truly errors: a missing model disables the trigger, a
//! failed scan degrades to "no optics", a failed layer draw is skipped. What
//! remains is input parsing, raster decoding, the external generator
//! boundary, and re-entrant run attempts.

use thiserror::Error;

/// The unified error type returned by public API functions.
#[derive(Debug, Error)]
pub enum ReframeError {
    /// JSON input failed to parse as a valid composition.
    #[error("Failed to parse composition: {source}{}", format_hint(.hint))]
    ParseError {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A raster could not be read or decoded.
    #[error("Raster error: {0}")]
    RasterError(String),

    /// The external strategy generator failed (timeout, transport, or an
    /// unparseable response). Any previously committed strategy is left
    /// untouched.
    #[error("Strategy generator failed: {0}")]
    GeneratorError(String),

    /// A run was triggered for an instance that already has one in flight.
    #[error("A run is already in flight for this instance")]
    RunInFlight,
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for ReframeError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the composition schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input — is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ReframeError::ParseError { source: e, hint }
    }
}
