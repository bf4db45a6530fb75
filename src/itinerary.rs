//! Itinerary response shaping
//!
//! Packages the generated itinerary text, the budget breakdown and the map
//! query into the [`TravelResponse`] returned to the front end. The itinerary
//! field is never empty: missing or failed generations are replaced by a
//! fallback message.

use tracing::warn;

use crate::budget::BudgetBreakdown;
use crate::llm::GenerationError;
use crate::models::{MapQuery, TravelResponse};

/// Warning code attached to responses whose itinerary is a fallback
pub const ITINERARY_FALLBACK: &str = "itinerary_fallback";

/// Prefixes older generation layers used to report failures in-band
const FAILURE_SENTINELS: &[&str] = &["⚠️", "Error:"];

/// Assemble the response for one trip request.
///
/// `generated` is the itinerary stage's outcome. An `Err`, text starting with a
/// failure sentinel, or text that is blank once cleaned up yields a fallback
/// itinerary.
#[must_use]
pub fn normalize(
    generated: Result<String, GenerationError>,
    budget: BudgetBreakdown,
    origin: &str,
    destination: &str,
) -> TravelResponse {
    let mut warnings = Vec::new();

    let itinerary = match generated {
        Ok(text) => {
            let reason = failure_reason(&text);
            let cleaned = if reason.is_none() { reformat(&text) } else { String::new() };
            if cleaned.trim().is_empty() {
                warn!(destination, "itinerary text unusable, substituting fallback");
                warnings.push(ITINERARY_FALLBACK.to_string());
                fallback_itinerary(destination, reason)
            } else {
                cleaned
            }
        }
        Err(err) => {
            warn!(destination, error = %err, "itinerary generation failed, substituting fallback");
            warnings.push(ITINERARY_FALLBACK.to_string());
            fallback_itinerary(destination, Some(err.user_message()))
        }
    };

    let map_query = MapQuery::directions(origin, destination);
    let map_url = map_url(&map_query);

    TravelResponse {
        itinerary,
        map_query,
        map_url,
        budget,
        warnings,
    }
}

/// In-band failure report, if the text starts with one of the sentinels
fn failure_reason(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    FAILURE_SENTINELS
        .iter()
        .any(|s| trimmed.starts_with(s))
        .then_some(trimmed)
}

fn fallback_itinerary(destination: &str, reason: Option<&str>) -> String {
    let mut message = format!(
        "## Itinerary unavailable\n\n\
         We could not generate a day-by-day itinerary for {destination} right now. \
         Your budget breakdown below is still valid; please try again in a few minutes."
    );
    if let Some(reason) = reason {
        message.push_str("\n\n");
        message.push_str(reason);
    }
    message
}

fn map_url(query: &MapQuery) -> String {
    // MapQuery only holds strings, serialization cannot fail
    serde_json::to_string(query).unwrap_or_default()
}

/// Light cleanup of model output that keeps Markdown emphasis intact
fn reformat(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = strip_code_fence(text.trim());

    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !previous_blank && !lines.is_empty() {
                lines.push(String::new());
            }
            previous_blank = true;
            continue;
        }
        previous_blank = false;

        let indent = line.len() - line.trim_start().len();
        let content = &line[indent..];
        match content.strip_prefix('•') {
            Some(rest) => lines.push(format!("{}- {}", &line[..indent], rest.trim_start())),
            None => lines.push(line.to_string()),
        }
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}

/// Remove a fence wrapping the whole text, e.g. "```markdown\n...\n```"
fn strip_code_fence(text: &str) -> &str {
    if text.chars().all(|c| c == '`') {
        return "";
    }
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim().contains(' ') => body.trim(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::allocate;
    use rstest::rstest;

    fn budget() -> BudgetBreakdown {
        allocate(18_000, Some(7)).breakdown
    }

    #[test]
    fn test_generated_text_is_kept() {
        let response = normalize(
            Ok("**Day 1**: Arrive in *Jaipur*\n- Amber Fort".to_string()),
            budget(),
            "Delhi",
            "Jaipur",
        );
        assert_eq!(response.itinerary, "**Day 1**: Arrive in *Jaipur*\n- Amber Fort");
        assert!(response.warnings.is_empty());
        assert_eq!(response.budget, budget());
    }

    #[test]
    fn test_map_query_descriptor() {
        let response = normalize(Ok("plan".to_string()), budget(), "Delhi", "Jaipur");
        assert_eq!(response.map_query, MapQuery::directions("Delhi", "Jaipur"));
        assert_eq!(response.map_query.query_type, "directions");
        let parsed: MapQuery = serde_json::from_str(&response.map_url).unwrap();
        assert_eq!(parsed, response.map_query);
    }

    #[rstest]
    #[case("")]
    #[case("   \n\t ")]
    #[case("Error: connection reset")]
    #[case("⚠️ Rate limit exceeded. Please try again in a few minutes.")]
    #[case("```\n```")]
    #[case("```markdown\n\n```")]
    #[case("```")]
    #[case("\r\n```\r\n\r\n\r\n```\r\n")]
    fn test_unusable_text_gets_fallback(#[case] raw: &str) {
        let response = normalize(Ok(raw.to_string()), budget(), "Delhi", "Jaipur");
        assert!(!response.itinerary.trim().is_empty());
        assert!(response.itinerary.contains("Itinerary unavailable"));
        assert!(response.itinerary.contains("Jaipur"));
        assert_eq!(response.warnings, vec![ITINERARY_FALLBACK.to_string()]);
        assert_eq!(response.map_query.destination, "Jaipur");
    }

    #[test]
    fn test_generation_error_reason_is_included() {
        let response = normalize(Err(GenerationError::Timeout), budget(), "Delhi", "Goa");
        assert!(response.itinerary.contains("Request timed out"));
        assert!(response.itinerary.contains("Goa"));
        assert_eq!(response.budget, budget());
    }

    #[test]
    fn test_sentinel_reason_is_included() {
        let response = normalize(Ok("Error: upstream reset".to_string()), budget(), "Delhi", "Goa");
        assert!(response.itinerary.ends_with("Error: upstream reset"));
    }

    #[test]
    fn test_empty_fence_fallback_omits_raw_text() {
        let response = normalize(Ok("```\n```".to_string()), budget(), "Delhi", "Goa");
        assert!(!response.itinerary.contains("```"));
        assert_eq!(response.warnings, vec![ITINERARY_FALLBACK.to_string()]);
    }

    #[test]
    fn test_reformat_cleans_whitespace_and_bullets() {
        let raw = "\r\n## Day 1\r\n\r\n\r\n\r\n• Breakfast   \r\n  • Hawa Mahal\r\n\r\n";
        assert_eq!(reformat(raw), "## Day 1\n\n- Breakfast\n  - Hawa Mahal");
    }

    #[rstest]
    #[case("```markdown\n# Plan\n- a\n```", "# Plan\n- a")]
    #[case("```\n# Plan\n```", "# Plan")]
    #[case("Use ```code``` here", "Use ```code``` here")]
    fn test_code_fence_is_stripped(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(reformat(raw), expected);
    }
}
