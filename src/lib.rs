//! Travelian - AI-assisted travel planning backend
//!
//! This library provides request validation, budget parsing and allocation,
//! prompt orchestration against a hosted language model, and the HTTP API
//! serving itineraries and chatbot answers.

pub mod api;
pub mod budget;
pub mod config;
pub mod error;
pub mod itinerary;
pub mod llm;
pub mod models;
pub mod planner;
pub mod telemetry;
pub mod validation;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use budget::{BudgetBreakdown, CurrencyHint, ParsedBudget, allocate, parse_budget};
pub use config::TravelianConfig;
pub use error::TravelianError;
pub use llm::{GeminiClient, GenerationError, Prompt, TextGenerator};
pub use models::{ChatbotRequest, ChatbotResponse, TravelRequest, TravelResponse};
pub use planner::TravelPlanner;
pub use validation::{ValidatedTrip, ValidationError, validate_request};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelianError>;
