//! Weather side of PicoWeather
//!
//! Decodes OpenWeather forecasts, classifies them into matrix icons and
//! labels, and keeps the last known display state.

pub mod types;
pub mod cache;
pub mod classify;
pub mod provider;

pub use types::*;
pub use cache::DisplayCache;
pub use classify::{classify, ConditionCategory, Diurnal};
pub use provider::{ClientError, OpenWeatherClient, StaticForecast, WeatherClient};
