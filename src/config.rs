//! Configuration management for the Travelian service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TravelianError;
use crate::budget::CurrencyHint;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Root configuration structure for the Travelian service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TravelianConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Text generation provider configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Trip planning policy
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Trace export configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API from a browser
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Upper bound for handling one request, generation included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Maximum accepted request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Directory with a built front end to serve for non-API paths
    #[serde(default)]
    pub static_dir: Option<String>,
    /// PEM certificate chain, used with the `tls` feature
    #[serde(default)]
    pub tls_cert_path: Option<String>,
    /// PEM private key, used with the `tls` feature
    #[serde(default)]
    pub tls_key_path: Option<String>,
}

/// Gemini API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; without one every generation call fails softly
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Base URL of the generative language API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_seconds: u64,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_gemini_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

/// Trip planning policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Longest accepted trip in days
    #[serde(default = "default_max_trip_days")]
    pub max_trip_days: u32,
    /// Total budget used when the descriptor is not recognized
    #[serde(default = "default_budget")]
    pub default_budget: u64,
    /// Currency symbol used in budget descriptors and prompts
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Digit group separator for amounts
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: char,
    /// Time allowed for all generation calls of one request; must stay below
    /// `server.request_timeout_seconds`
    #[serde(default = "default_plan_timeout")]
    pub plan_timeout_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// OpenTelemetry trace export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP/HTTP endpoint; export is disabled when unset
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://localhost:3002".to_string(),
    ]
}

fn default_request_timeout() -> u64 {
    180
}

fn default_body_limit() -> usize {
    64 * 1024
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout() -> u64 {
    60
}

fn default_gemini_max_retries() -> u32 {
    2
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_max_trip_days() -> u32 {
    crate::validation::DEFAULT_MAX_TRIP_DAYS
}

fn default_budget() -> u64 {
    crate::budget::DEFAULT_TOTAL_BUDGET
}

fn default_plan_timeout() -> u64 {
    170
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_thousands_separator() -> char {
    ','
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_service_name() -> String {
    "travelian".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            request_timeout_seconds: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            static_dir: None,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout_seconds: default_gemini_timeout(),
            max_retries: default_gemini_max_retries(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_trip_days: default_max_trip_days(),
            default_budget: default_budget(),
            currency_symbol: default_currency_symbol(),
            thousands_separator: default_thousands_separator(),
            plan_timeout_seconds: default_plan_timeout(),
        }
    }
}

impl PlannerConfig {
    /// Currency context for budget parsing and amount formatting
    #[must_use]
    pub fn currency(&self) -> CurrencyHint {
        CurrencyHint::new(self.currency_symbol.clone(), self.thousands_separator)
    }

    /// Deadline for the generation calls of one request
    #[must_use]
    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_seconds)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: default_service_name(),
        }
    }
}

impl TravelianConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_layers(config_path, None, |key| std::env::var(key).ok())
    }

    /// Layer defaults, the TOML file, `TRAVELIAN__*` variables and the plain
    /// variables read through `lookup`, in that order.
    ///
    /// `environment` replaces the process environment for the prefixed layer
    /// when given.
    fn load_layers<F>(
        config_path: Option<PathBuf>,
        environment: Option<HashMap<String, String>>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with TRAVELIAN__ prefix
        builder = builder.add_source(
            Environment::with_prefix("TRAVELIAN")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .try_parsing(true)
                .source(environment),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TravelianConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Plain variables understood by existing deployments
        config.apply_env_overrides(lookup);

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Apply command line overrides and validate the result again
    pub fn with_cli_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        verbose: bool,
    ) -> Result<Self> {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        if verbose {
            self.logging.level = "debug".to_string();
        }
        self.validate()?;
        Ok(self)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travelian").join("config.toml"))
    }

    /// Apply `GEMINI_API_KEY`, `ALLOWED_ORIGINS`, `HOST` and `PORT`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.gemini.api_key = Some(key.trim().to_string());
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            if !origins.is_empty() {
                self.server.allowed_origins = origins;
            }
        }
        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(port = %port, "ignoring unparsable PORT"),
            }
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.server.body_limit_bytes == 0 {
            self.server.body_limit_bytes = default_body_limit();
        }
        if self.gemini.model.is_empty() {
            self.gemini.model = default_gemini_model();
        }
        if self.gemini.base_url.is_empty() {
            self.gemini.base_url = default_gemini_base_url();
        }
        if self.gemini.timeout_seconds == 0 {
            self.gemini.timeout_seconds = default_gemini_timeout();
        }
        if self.planner.max_trip_days == 0 {
            self.planner.max_trip_days = default_max_trip_days();
        }
        if self.planner.plan_timeout_seconds == 0 {
            self.planner.plan_timeout_seconds = default_plan_timeout()
                .min(self.server.request_timeout_seconds.saturating_sub(1))
                .max(1);
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.telemetry.service_name.is_empty() {
            self.telemetry.service_name = default_service_name();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        // A missing key only disables generation
        if let Some(api_key) = &self.gemini.api_key {
            if api_key.is_empty() {
                return Err(TravelianError::config(
                    "Gemini API key cannot be empty if provided. Either remove it or provide a valid key."
                ).into());
            }

            if api_key.len() < 8 {
                return Err(TravelianError::config(
                    "Gemini API key appears to be invalid (too short). Please check your API key."
                ).into());
            }

            if api_key.len() > 200 {
                return Err(TravelianError::config(
                    "Gemini API key appears to be invalid (too long). Please check your API key."
                ).into());
            }

            if !api_key.starts_with("AI") {
                warn!("Gemini API key format looks unusual, keys normally start with 'AI'");
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(TravelianError::config("Server port cannot be 0").into());
        }

        if !(1..=600).contains(&self.server.request_timeout_seconds) {
            return Err(TravelianError::config(
                "Request timeout must be between 1 and 600 seconds"
            ).into());
        }

        if !(1..=600).contains(&self.gemini.timeout_seconds) {
            return Err(TravelianError::config(
                "Gemini API timeout must be between 1 and 600 seconds"
            ).into());
        }

        if self.gemini.max_retries > 10 {
            return Err(TravelianError::config(
                "Gemini API max retries cannot exceed 10"
            ).into());
        }

        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(TravelianError::config(
                "Gemini temperature must be between 0.0 and 2.0"
            ).into());
        }

        if !(0.0..=1.0).contains(&self.gemini.top_p) {
            return Err(TravelianError::config(
                "Gemini top_p must be between 0.0 and 1.0"
            ).into());
        }

        if self.planner.plan_timeout_seconds == 0
            || self.planner.plan_timeout_seconds >= self.server.request_timeout_seconds
        {
            return Err(TravelianError::config(format!(
                "Planner timeout ({}s) must be positive and shorter than the request timeout ({}s)",
                self.planner.plan_timeout_seconds, self.server.request_timeout_seconds
            ))
            .into());
        }

        if !(1..=365).contains(&self.planner.max_trip_days) {
            return Err(TravelianError::config(
                "Maximum trip length must be between 1 and 365 days"
            ).into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelianError::config(
                format!("Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_log_levels.join(", ")
                )
            ).into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelianError::config(
                format!("Invalid log format '{}'. Must be one of: {}",
                    self.logging.format,
                    valid_log_formats.join(", ")
                )
            ).into());
        }

        if !is_http_url(&self.gemini.base_url) {
            return Err(TravelianError::config(
                "Gemini API base URL must be a valid HTTP or HTTPS URL"
            ).into());
        }

        if let Some(origin) = self.server.allowed_origins.iter().find(|o| !is_http_url(o)) {
            return Err(TravelianError::config(
                format!("Allowed origin '{origin}' must be an HTTP or HTTPS URL")
            ).into());
        }

        if let Some(endpoint) = &self.telemetry.otlp_endpoint {
            if !is_http_url(endpoint) {
                return Err(TravelianError::config(
                    "OTLP endpoint must be a valid HTTP or HTTPS URL"
                ).into());
            }
        }

        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
