//! Trip planning request and response records

use serde::{Deserialize, Serialize};

use crate::budget::BudgetBreakdown;

/// Trip planning request as submitted by the front end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelRequest {
    pub origin: String,
    pub destination: String,
    /// Start date, `YYYY-MM-DD` or an RFC 3339 timestamp
    pub start_date: String,
    /// End date in the same notation as `start_date`
    #[serde(default)]
    pub end_date: Option<String>,
    /// Trip length in days
    #[serde(default)]
    pub duration: Option<i64>,
    /// Free-text budget descriptor, e.g. `"Moderate (₹10,000 - ₹25,000)"`
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub travel_style: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
}

/// Data a map-rendering collaborator needs to draw the route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapQuery {
    pub origin: String,
    pub destination: String,
    #[serde(rename = "type")]
    pub query_type: String,
}

impl MapQuery {
    pub const DIRECTIONS: &'static str = "directions";

    /// Route query between two places
    #[must_use]
    pub fn directions(origin: &str, destination: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            query_type: Self::DIRECTIONS.to_string(),
        }
    }
}

/// Trip planning response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelResponse {
    /// Itinerary text with lightweight Markdown; never empty
    pub itinerary: String,
    pub map_query: MapQuery,
    /// `map_query` serialized as a JSON string, the shape the front end parses
    pub map_url: String,
    pub budget: BudgetBreakdown,
    /// Codes of soft failures handled while building the response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_front_end_payload() {
        let json = r#"{
            "origin": "Delhi",
            "destination": "Jaipur",
            "startDate": "2025-04-05",
            "endDate": "2025-04-08",
            "duration": 3,
            "budget": "Moderate (₹10,000 - ₹25,000)",
            "travelStyle": "Cultural",
            "interests": ["History", "Food"],
            "specialRequirements": ""
        }"#;
        let request: TravelRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.start_date, "2025-04-05");
        assert_eq!(request.end_date.as_deref(), Some("2025-04-08"));
        assert_eq!(request.duration, Some(3));
        assert_eq!(request.travel_style, "Cultural");
        assert_eq!(request.interests.len(), 2);
    }

    #[test]
    fn test_request_optional_fields_default() {
        let json = r#"{"origin": "Delhi", "destination": "Agra", "startDate": "2025-04-05"}"#;
        let request: TravelRequest = serde_json::from_str(json).unwrap();
        assert!(request.end_date.is_none());
        assert!(request.duration.is_none());
        assert!(request.budget.is_empty());
        assert!(request.interests.is_empty());
    }

    #[test]
    fn test_map_query_serializes_type_field() {
        let value = serde_json::to_value(MapQuery::directions("Delhi", "Agra")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"origin": "Delhi", "destination": "Agra", "type": "directions"})
        );
    }
}
