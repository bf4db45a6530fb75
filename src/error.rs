//! Error types and handling for the Travelian service

use thiserror::Error;

/// Main error type for the Travelian service
#[derive(Error, Debug)]
pub enum TravelianError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// External API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl TravelianError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelianError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TravelianError::Api { .. } => {
                "Unable to reach the text generation service. Please try again later.".to_string()
            }
            TravelianError::Io { source } => {
                format!("Could not open the listening socket or a certificate file: {source}")
            }
            TravelianError::General { message } => message.clone(),
        }
    }
}
