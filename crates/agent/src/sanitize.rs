//! Observation sanitization.
//!
//! Tool output is fed back into the context window verbatim, which makes a
//! single oversized observation (a base64 image, a giant scrape) a threat
//! to the token budget. Embedded binary-as-text payloads are replaced with
//! a placeholder and the total length is capped with a truncation marker.

use regex::Regex;
use std::sync::OnceLock;

/// Placeholder substituted for base64 image data URIs.
const B64_PLACEHOLDER: &str = "[B64_IMAGE_DATA]";

/// Marker appended when an observation is cut at the cap.
const TRUNCATION_MARKER: &str = "... [TRUNCATED]";

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"data:image/[a-zA-Z]*;base64,[a-zA-Z0-9+/]*={0,2}")
            .expect("data URI pattern compiles")
    })
}

/// Scrub and cap a tool observation before it re-enters the context.
pub fn sanitize_observation(result: &str, max_chars: usize) -> String {
    let cleaned = data_uri_pattern().replace_all(result, B64_PLACEHOLDER);

    if cleaned.chars().count() <= max_chars {
        return cleaned.into_owned();
    }

    let mut truncated: String = cleaned.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
