//! OpenWeather "One Call" forecast client.
//!
//! The client only fetches and decodes; picking the hourly entry is the one
//! piece of interpretation it does. Classification happens elsewhere.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::types::{FetchError, RawForecastItem, Units};

const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
const ONE_CALL_PATH: &str = "/data/2.5/onecall";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "PicoWeather/0.1.0";

/// Coordinate value meaning "never configured"
pub const UNSET_COORDINATE: f64 = 999.0;

/// Hourly entry used when nothing else is configured: one hour from now
pub const DEFAULT_FORECAST_OFFSET: usize = 1;

/// Language codes the provider accepts for `lang`
pub const LANGUAGES: &[&str] = &[
    "af", "al", "ar", "az", "bg", "ca", "cz", "da", "de", "el", "en", "eu", "fa", "fi", "fr",
    "gl", "he", "hi", "hr", "hu", "id", "it", "ja", "kr", "la", "lt", "mk", "no", "nl", "pl",
    "pt", "pt_br", "ro", "ru", "se", "sv", "sk", "sl", "sp", "es", "sr", "th", "tr", "ua", "uk",
    "vi", "zh_cn", "zh_tw", "zu",
];

/// Response blocks the provider can be asked to leave out
pub const EXCLUSIONS: &[&str] = &["current", "minutely", "hourly", "daily", "alerts"];

/// Source of forecast items for the control loop
#[allow(async_fn_in_trait)]
pub trait WeatherClient {
    /// Fetch the forecast entry the display should show.
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<RawForecastItem, FetchError>;
}

/// Client construction errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("OpenWeather client requires an API key")]
    MissingApiKey,
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    hourly: Option<Vec<RawForecastItem>>,
}

/// Check that a coordinate pair is usable
pub fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), FetchError> {
    let invalid = FetchError::InvalidCoordinates {
        latitude,
        longitude,
    };

    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(invalid);
    }
    if latitude == UNSET_COORDINATE || longitude == UNSET_COORDINATE {
        return Err(invalid);
    }
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid);
    }
    Ok(())
}

/// Normalise a language code, `None` when the provider does not know it
pub fn normalize_language(language: &str) -> Option<String> {
    let lang = language.to_lowercase();
    LANGUAGES.contains(&lang.as_str()).then_some(lang)
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
    units: Units,
    language: String,
    excludes: Vec<String>,
    forecast_offset: usize,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClientError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: OPENWEATHER_BASE_URL.to_string(),
            units: Units::default(),
            language: "en".to_string(),
            excludes: Vec::new(),
            forecast_offset: DEFAULT_FORECAST_OFFSET,
        })
    }

    /// Point the client at another host (mock servers, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        tracing::debug!("OpenWeather units set: {}", units.as_str());
        self
    }

    /// Set the report language, falling back to English for unknown codes
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = match normalize_language(language) {
            Some(lang) => lang,
            None => {
                tracing::warn!(
                    "Unknown OpenWeather language '{}', using default (en)",
                    language
                );
                "en".to_string()
            }
        };
        self
    }

    /// Ask the provider to leave out response blocks.
    ///
    /// Unknown names are dropped; if none are left the previous setting is
    /// kept.
    pub fn with_excludes<S: AsRef<str>>(mut self, excludes: &[S]) -> Self {
        let matches: Vec<String> = excludes
            .iter()
            .map(|e| e.as_ref().to_lowercase())
            .filter(|e| EXCLUSIONS.contains(&e.as_str()))
            .collect();

        if matches.len() < excludes.len() {
            tracing::warn!("Ignoring unknown OpenWeather exclusions");
        }
        if matches.is_empty() {
            return self;
        }
        if matches.iter().any(|e| e == "hourly") {
            tracing::warn!("Excluding 'hourly' leaves no forecast to display");
        }

        tracing::debug!("OpenWeather excludes set: {}", matches.join(","));
        self.excludes = matches;
        self
    }

    /// Index into the hourly array of the entry to return
    pub fn with_forecast_offset(mut self, offset: usize) -> Self {
        self.forecast_offset = offset;
        self
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn forecast_offset(&self) -> usize {
        self.forecast_offset
    }

    /// Build the request URL for a location
    pub fn request_url(&self, latitude: f64, longitude: f64) -> Result<Url, FetchError> {
        check_coordinates(latitude, longitude)?;

        let mut url = Url::parse(&format!("{}{}", self.base_url, ONE_CALL_PATH))
            .map_err(|e| FetchError::Network(format!("Invalid base URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("lat", &format!("{:.6}", latitude))
                .append_pair("lon", &format!("{:.6}", longitude))
                .append_pair("appid", &self.api_key)
                .append_pair("units", self.units.as_str());
            if !self.language.is_empty() {
                query.append_pair("lang", &self.language);
            }
            if !self.excludes.is_empty() {
                query.append_pair("exclude", &self.excludes.join(","));
            }
        }

        Ok(url)
    }

    /// Copy of `url` safe for logs: the `appid` value is replaced after
    /// decoding, so keys with reserved characters are hidden too.
    fn redacted(&self, url: &Url) -> String {
        let mut safe = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "appid" { "<redacted>".into() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        safe.query_pairs_mut().clear().extend_pairs(pairs);
        safe.to_string()
    }

    fn select_hourly(&self, response: OneCallResponse) -> Result<RawForecastItem, FetchError> {
        let hourly = response
            .hourly
            .ok_or_else(|| FetchError::Decode("response has no hourly forecast".to_string()))?;

        hourly
            .into_iter()
            .nth(self.forecast_offset)
            .ok_or_else(|| {
                FetchError::Decode(format!(
                    "no hourly forecast at index {}",
                    self.forecast_offset
                ))
            })
    }
}

impl WeatherClient for OpenWeatherClient {
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<RawForecastItem, FetchError> {
        let url = self.request_url(latitude, longitude)?;
        tracing::debug!("Request URL: {}", self.redacted(&url));

        let response = self.client.get(url).send().await?;

        let status = response.status();
        tracing::debug!("HTTP status: {}", status);
        if status != StatusCode::OK {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let body: OneCallResponse = response.json().await?;
        self.select_hourly(body)
    }
}

/// Client that always returns the same item, for running without network
#[derive(Debug, Clone)]
pub struct StaticForecast {
    item: RawForecastItem,
}

impl StaticForecast {
    pub fn new(item: RawForecastItem) -> Self {
        Self { item }
    }
}

impl Default for StaticForecast {
    fn default() -> Self {
        Self::new(RawForecastItem::new(600, "Snow", "13d", 11.5))
    }
}

impl WeatherClient for StaticForecast {
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<RawForecastItem, FetchError> {
        check_coordinates(latitude, longitude)?;
        Ok(self.item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenWeatherClient {
        OpenWeatherClient::new("KEY123").unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OpenWeatherClient::new("  "),
            Err(ClientError::MissingApiKey)
        ));
    }

    #[test]
    fn test_check_coordinates() {
        assert!(check_coordinates(51.5, -0.12).is_ok());
        assert!(check_coordinates(90.0, 180.0).is_ok());
        assert!(check_coordinates(UNSET_COORDINATE, 0.0).is_err());
        assert!(check_coordinates(0.0, UNSET_COORDINATE).is_err());
        assert!(check_coordinates(90.5, 0.0).is_err());
        assert!(check_coordinates(0.0, -180.5).is_err());
        assert!(check_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_request_url_defaults() {
        let url = client().request_url(51.5, -0.125).unwrap();
        assert_eq!(url.path(), "/data/2.5/onecall");
        let query = url.query().unwrap_or_default();
        assert!(query.contains("lat=51.500000"));
        assert!(query.contains("lon=-0.125000"));
        assert!(query.contains("appid=KEY123"));
        assert!(query.contains("units=metric"));
        assert!(query.contains("lang=en"));
        assert!(!query.contains("exclude"));
    }

    #[test]
    fn test_request_url_rejects_bad_coordinates() {
        assert!(matches!(
            client().request_url(999.0, 999.0),
            Err(FetchError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_language_fallback() {
        assert_eq!(client().with_language("DE").language(), "de");
        assert_eq!(client().with_language("pt_BR").language(), "pt_br");
        assert_eq!(client().with_language("klingon").language(), "en");
    }

    #[test]
    fn test_excludes_filter_unknown() {
        let c = client().with_excludes(&["daily", "bogus", "alerts"]);
        assert_eq!(c.excludes(), ["daily".to_string(), "alerts".to_string()]);
    }

    #[test]
    fn test_excludes_keep_previous_when_none_valid() {
        let c = client().with_excludes(&["minutely"]).with_excludes(&["nope"]);
        assert_eq!(c.excludes(), ["minutely".to_string()]);
    }

    fn one_call(body: serde_json::Value) -> OneCallResponse {
        serde_json::from_value(body).unwrap()
    }

    fn two_hours() -> OneCallResponse {
        one_call(serde_json::json!({
            "hourly": [
                {"feels_like": 1.0, "weather": [{"id": 800, "main": "Clear", "icon": "01d"}]},
                {"feels_like": 2.0, "weather": [{"id": 500, "main": "Rain", "icon": "10d"}]}
            ]
        }))
    }

    #[test]
    fn test_select_hourly_offset() {
        let item = client().select_hourly(two_hours()).unwrap();
        assert_eq!(item.condition_id(), 500);

        let item = client().with_forecast_offset(0).select_hourly(two_hours()).unwrap();
        assert_eq!(item.condition_id(), 800);

        assert!(matches!(
            client().with_forecast_offset(2).select_hourly(two_hours()),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_select_hourly_missing_array() {
        let body = one_call(serde_json::json!({"current": {}}));
        assert!(matches!(
            client().select_hourly(body),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_redacts_api_key() {
        let c = client();
        let url = c.request_url(1.0, 2.0).unwrap();
        let logged = c.redacted(&url);
        assert!(!logged.contains("KEY123"));
        assert!(logged.contains("appid=%3Credacted%3E"));
        assert!(logged.contains("lat=1.000000"));
    }

    #[test]
    fn test_redacts_api_key_with_reserved_characters() {
        let c = OpenWeatherClient::new("k&y=s/cr+t key").unwrap();
        let url = c.request_url(1.0, 2.0).unwrap();
        assert!(url.as_str().contains("appid=k%26y%3Ds%2Fcr%2Bt+key"));

        let logged = c.redacted(&url);
        assert!(!logged.contains("k%26y"));
        assert!(!logged.contains("cr%2Bt"));
        assert!(logged.contains("appid=%3Credacted%3E"));
        assert!(logged.contains("units=metric"));
    }

    #[tokio::test]
    async fn test_static_forecast() {
        let client = StaticForecast::default();
        let item = client.fetch_forecast(51.5, 0.0).await.unwrap();
        assert_eq!(item.condition_main(), "Snow");
        assert!(client.fetch_forecast(999.0, 0.0).await.is_err());
    }
}
