//! Data models for the Travelian API
//!
//! This module contains the request and response records exchanged with the
//! front end:
//! - Travel: trip planning request, generated itinerary response and map query
//! - Chat: chatbot question, reply and caller-held conversation history
//! - Health: service liveness report

pub mod chat;
pub mod health;
pub mod travel;

// Re-export all public types for convenient access
pub use chat::{ChatMessage, ChatRole, ChatbotRequest, ChatbotResponse};
pub use health::HealthResponse;
pub use travel::{MapQuery, TravelRequest, TravelResponse};
