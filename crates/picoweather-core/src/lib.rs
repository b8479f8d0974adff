pub mod app;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod scheduler;

pub use app::App;
pub use clock::{Clock, SystemClock};
pub use config::{
    Config, DisplayConfig, ScheduleConfig, ValidationIssue, ValidationResult, WeatherConfig,
};
pub use display::{scroll_text, DisplayDevice, TerminalMatrix};
pub use error::{AppError, ConfigError, FetchError};
pub use scheduler::{RefreshScheduler, ScheduledActions, SchedulerConfig};

use anyhow::Result;

/// Initialize logging
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("PicoWeather core initialized");
    Ok(())
}
