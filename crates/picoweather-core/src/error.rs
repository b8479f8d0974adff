//! Centralized error types for PicoWeather.
//!
//! Fetch failures never escape the control loop; these types cover start-up,
//! where the binary reports a short message next to the full error.

use thiserror::Error;

use picoweather_weather::ClientError;
pub use picoweather_weather::FetchError;

/// Start-up error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather client error: {0}")]
    Client(#[from] ClientError),
}

impl AppError {
    /// Short message suitable for the matrix or a console line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Client(ClientError::MissingApiKey) => {
                "Weather API key is missing. Check your settings."
            }
            AppError::Client(ClientError::Http(_)) => {
                "Unable to set up the weather connection. Please try again."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}
