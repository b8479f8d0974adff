use anyhow::{Context, Result};
use picoweather_weather::provider::{normalize_language, EXCLUSIONS, UNSET_COORDINATE};
use picoweather_weather::{OpenWeatherClient, Units};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, ConfigError};

/// Environment variable that supplies the API key when the file has none
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Hourly entries returned by the provider (48 hours)
const HOURLY_ENTRIES: usize = 48;

/// Free-tier daily allowance of the provider
const PROVIDER_DAILY_LIMIT: u32 = 1000;

/// One problem found in a config file, keyed by its dotted setting name
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Problems found by [`Config::validate`].
///
/// Errors stop the device from starting; warnings are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Errors joined into one line for the start-up failure message
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Forecast source settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Timer settings for the control loop
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Matrix and clock settings
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key (falls back to `OPENWEATHER_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Decimal latitude of the forecast location
    #[serde(default = "unset_coordinate")]
    pub latitude: f64,

    /// Decimal longitude of the forecast location
    #[serde(default = "unset_coordinate")]
    pub longitude: f64,

    #[serde(default)]
    pub units: Units,

    /// Report language code
    #[serde(default = "default_language")]
    pub language: String,

    /// Response blocks to leave out of the request
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Index into the hourly forecast (1 = one hour ahead)
    #[serde(default = "default_forecast_offset")]
    pub forecast_offset: usize,

    /// Show built-in test data instead of calling the API
    #[serde(default)]
    pub demo: bool,
}

fn unset_coordinate() -> f64 {
    UNSET_COORDINATE
}

fn default_language() -> String {
    "en".to_string()
}

fn default_forecast_offset() -> usize {
    1
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            latitude: UNSET_COORDINATE,
            longitude: UNSET_COORDINATE,
            units: Units::default(),
            language: default_language(),
            exclude: Vec::new(),
            forecast_offset: default_forecast_offset(),
            demo: false,
        }
    }
}

impl WeatherConfig {
    /// API key from the file, or from the environment when the file has none
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Build the OpenWeather client these settings describe
    pub fn build_client(&self) -> std::result::Result<OpenWeatherClient, AppError> {
        self.client_with_key(self.resolved_api_key())
    }

    fn client_with_key(
        &self,
        api_key: Option<String>,
    ) -> std::result::Result<OpenWeatherClient, AppError> {
        let api_key =
            api_key.ok_or_else(|| ConfigError::MissingSetting("weather.api_key".to_string()))?;

        Ok(OpenWeatherClient::new(api_key)?
            .with_units(self.units)
            .with_language(&self.language)
            .with_excludes(&self.exclude)
            .with_forecast_offset(self.forecast_offset))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between forecast fetches
    #[serde(default = "default_forecast_period")]
    pub forecast_period_secs: u64,

    /// Seconds between display repaints
    #[serde(default = "default_display_period")]
    pub display_period_secs: u64,

    /// Maximum API calls per calendar day
    #[serde(default = "default_daily_call_cap")]
    pub daily_call_cap: u32,

    /// Milliseconds between control loop iterations
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_forecast_period() -> u64 {
    15 * 60
}

fn default_display_period() -> u64 {
    20
}

fn default_daily_call_cap() -> u32 {
    990
}

fn default_poll_interval() -> u64 {
    250
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            forecast_period_secs: default_forecast_period(),
            display_period_secs: default_display_period(),
            daily_call_cap: default_daily_call_cap(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl ScheduleConfig {
    pub fn forecast_period(&self) -> Duration {
        Duration::from_secs(self.forecast_period_secs)
    }

    pub fn display_period(&self) -> Duration {
        Duration::from_secs(self.display_period_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Hours east of UTC, used to decide when a new day starts
    #[serde(default)]
    pub tz_offset_hours: i32,

    /// Text shown once at start-up
    #[serde(default = "default_banner")]
    pub banner: String,
}

fn default_banner() -> String {
    format!("PicoWeather {}", env!("CARGO_PKG_VERSION"))
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            tz_offset_hours: 0,
            banner: default_banner(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path, creating default if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!("No config at {}, writing defaults", config_path.display());
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    /// Validate an already loaded config, logging warnings
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !self.weather.demo && self.weather.resolved_api_key().is_none() {
            result.add_error(
                "weather.api_key",
                format!("API key is required (set it here or in {})", API_KEY_ENV),
            );
        }

        let (lat, lon) = (self.weather.latitude, self.weather.longitude);
        if lat == UNSET_COORDINATE || lon == UNSET_COORDINATE {
            result.add_error("weather.latitude", "Location co-ordinates are not set");
        } else {
            if !(-90.0..=90.0).contains(&lat) {
                result.add_error("weather.latitude", "Latitude must be between -90 and 90");
            }
            if !(-180.0..=180.0).contains(&lon) {
                result.add_error("weather.longitude", "Longitude must be between -180 and 180");
            }
        }

        if normalize_language(&self.weather.language).is_none() {
            result.add_warning(
                "weather.language",
                format!("Unknown language '{}', English will be used", self.weather.language),
            );
        }

        for item in &self.weather.exclude {
            if !EXCLUSIONS.contains(&item.to_lowercase().as_str()) {
                result.add_warning("weather.exclude", format!("Unknown exclusion '{}'", item));
            } else if item.eq_ignore_ascii_case("hourly") {
                result.add_error("weather.exclude", "The hourly forecast cannot be excluded");
            }
        }

        if self.weather.forecast_offset >= HOURLY_ENTRIES {
            result.add_error(
                "weather.forecast_offset",
                format!("Offset must be below {}", HOURLY_ENTRIES),
            );
        }

        if self.schedule.display_period_secs == 0 {
            result.add_error(
                "schedule.display_period_secs",
                "Display period must be greater than 0",
            );
        }

        if self.schedule.forecast_period_secs < 60 {
            result.add_warning(
                "schedule.forecast_period_secs",
                "Forecast period under a minute burns through the daily allowance quickly",
            );
        }

        if self.schedule.daily_call_cap == 0 {
            result.add_warning(
                "schedule.daily_call_cap",
                "Daily call cap is 0, forecasts will never be fetched",
            );
        } else if self.schedule.daily_call_cap > PROVIDER_DAILY_LIMIT {
            result.add_warning(
                "schedule.daily_call_cap",
                format!("Daily call cap exceeds the provider's {} call allowance", PROVIDER_DAILY_LIMIT),
            );
        }

        if self.schedule.poll_interval_ms == 0 {
            result.add_error(
                "schedule.poll_interval_ms",
                "Poll interval must be greater than 0",
            );
        }

        if !(-12..=14).contains(&self.display.tz_offset_hours) {
            result.add_error(
                "display.tz_offset_hours",
                "Timezone offset must be between -12 and 14 hours",
            );
        }

        result
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("picoweather");

        Ok(config_dir.join("config.toml"))
    }
}
