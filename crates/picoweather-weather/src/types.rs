use serde::{Deserialize, Serialize};

/// Unit system requested from the forecast provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Value of the `units` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }

    /// Letter drawn after the degree glyph on the matrix
    pub fn symbol(&self) -> char {
        match self {
            Self::Metric => 'c',
            Self::Imperial => 'f',
            Self::Standard => 'k',
        }
    }
}

/// Glyphs the matrix knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IconKey {
    ClearDay,
    ClearNight,
    Rain,
    LightRain,
    Snow,
    Sleet,
    Wind,
    Fog,
    Cloudy,
    PartlyCloudy,
    Thunderstorm,
    Tornado,
    #[default]
    None,
}

impl IconKey {
    pub const ALL: [IconKey; 13] = [
        Self::ClearDay,
        Self::ClearNight,
        Self::Rain,
        Self::LightRain,
        Self::Snow,
        Self::Sleet,
        Self::Wind,
        Self::Fog,
        Self::Cloudy,
        Self::PartlyCloudy,
        Self::Thunderstorm,
        Self::Tornado,
        Self::None,
    ];

    /// Resolve a key string to a glyph.
    ///
    /// Lowercased labels such as `windy` and `foggy` map onto the `wind` and
    /// `fog` glyphs; anything outside the set draws the `none` glyph.
    pub fn from_key(key: &str) -> Self {
        match key {
            "clearday" => Self::ClearDay,
            "clearnight" => Self::ClearNight,
            "rain" => Self::Rain,
            "lightrain" => Self::LightRain,
            "snow" => Self::Snow,
            "sleet" => Self::Sleet,
            "wind" | "windy" => Self::Wind,
            "fog" | "foggy" => Self::Fog,
            "cloudy" => Self::Cloudy,
            "partlycloudy" => Self::PartlyCloudy,
            "thunderstorm" => Self::Thunderstorm,
            "tornado" => Self::Tornado,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClearDay => "clearday",
            Self::ClearNight => "clearnight",
            Self::Rain => "rain",
            Self::LightRain => "lightrain",
            Self::Snow => "snow",
            Self::Sleet => "sleet",
            Self::Wind => "wind",
            Self::Fog => "fog",
            Self::Cloudy => "cloudy",
            Self::PartlyCloudy => "partlycloudy",
            Self::Thunderstorm => "thunderstorm",
            Self::Tornado => "tornado",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for IconKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the provider's `weather` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConditionEntry {
    pub id: Option<i32>,
    pub main: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
}

/// A single hourly forecast entry as decoded from the provider.
///
/// Only the fields the classifier reads are kept; everything else in the
/// provider payload is ignored during decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawForecastItem {
    #[serde(default)]
    pub weather: Vec<ConditionEntry>,
    #[serde(default)]
    pub feels_like: f64,
}

impl RawForecastItem {
    /// Build an item carrying a single condition entry
    pub fn new(
        condition_id: i32,
        condition_main: impl Into<String>,
        icon_hint: impl Into<String>,
        feels_like: f64,
    ) -> Self {
        Self {
            weather: vec![ConditionEntry {
                id: Some(condition_id),
                main: Some(condition_main.into()),
                icon: Some(icon_hint.into()),
                description: None,
            }],
            feels_like,
        }
    }

    /// Item with no condition entries at all
    pub fn without_conditions(feels_like: f64) -> Self {
        Self {
            weather: Vec::new(),
            feels_like,
        }
    }

    fn primary(&self) -> Option<&ConditionEntry> {
        self.weather.first()
    }

    pub fn has_conditions(&self) -> bool {
        !self.weather.is_empty()
    }

    /// Condition code of the first entry, 0 when absent
    pub fn condition_id(&self) -> i32 {
        self.primary().and_then(|w| w.id).unwrap_or(0)
    }

    /// Main label of the first entry, `"None"` when absent
    pub fn condition_main(&self) -> &str {
        self.primary()
            .and_then(|w| w.main.as_deref())
            .unwrap_or("None")
    }

    pub fn icon_hint(&self) -> Option<&str> {
        self.primary().and_then(|w| w.icon.as_deref())
    }

    pub fn feels_like_temp(&self) -> f64 {
        self.feels_like
    }
}

/// What the matrix shows: produced by the classifier, reused until the next
/// successful fetch replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayState {
    pub icon_key: IconKey,
    pub label: String,
    pub temperature: f64,
}

/// Forecast fetch errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unable to retrieve forecast data (code: {0})")]
    BadStatus(u16),
    #[error("Unable to decode forecast data: {0}")]
    Decode(String),
    #[error("Invalid coordinates: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

impl FetchError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "Unable to reach the weather service. Check the connection.",
            Self::BadStatus(401) => "Weather API key is invalid. Check settings.",
            Self::BadStatus(429) => "Weather API call limit reached. Try again later.",
            Self::BadStatus(status) if *status >= 500 => {
                "Weather service is having issues. Try again later."
            }
            Self::BadStatus(_) => "Weather request failed.",
            Self::Decode(_) => "Received an unexpected forecast response.",
            Self::InvalidCoordinates { .. } => "Location co-ordinates are invalid. Check settings.",
        }
    }

    /// Whether trying again on a later tick can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Decode(_) => true,
            Self::BadStatus(status) => *status >= 500 || *status == 429 || *status == 408,
            Self::InvalidCoordinates { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::BadStatus(status.as_u16())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_key_round_trips_through_its_name() {
        for icon in IconKey::ALL {
            assert_eq!(IconKey::from_key(icon.as_str()), icon);
        }
    }

    #[test]
    fn test_icon_key_adjective_aliases() {
        assert_eq!(IconKey::from_key("windy"), IconKey::Wind);
        assert_eq!(IconKey::from_key("foggy"), IconKey::Fog);
    }

    #[test]
    fn test_icon_key_unknown_is_none() {
        assert_eq!(IconKey::from_key("haze"), IconKey::None);
        assert_eq!(IconKey::from_key(""), IconKey::None);
    }

    #[test]
    fn test_icon_key_serializes_lowercase() {
        let json = serde_json::to_string(&IconKey::PartlyCloudy).unwrap();
        assert_eq!(json, "\"partlycloudy\"");
    }

    #[test]
    fn test_raw_item_defaults_without_weather() {
        let item: RawForecastItem = serde_json::from_str(r#"{"feels_like": 3.5}"#).unwrap();
        assert!(!item.has_conditions());
        assert_eq!(item.condition_id(), 0);
        assert_eq!(item.condition_main(), "None");
        assert_eq!(item.icon_hint(), None);
        assert_eq!(item.feels_like_temp(), 3.5);
    }

    #[test]
    fn test_raw_item_decodes_provider_entry() {
        let item: RawForecastItem = serde_json::from_value(serde_json::json!({
            "dt": 1_700_000_000,
            "temp": 12.0,
            "feels_like": 10.4,
            "weather": [
                {"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"},
                {"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}
            ]
        }))
        .unwrap();
        assert_eq!(item.condition_id(), 803);
        assert_eq!(item.condition_main(), "Clouds");
        assert_eq!(item.icon_hint(), Some("04d"));
        assert_eq!(item.feels_like_temp(), 10.4);
    }

    #[test]
    fn test_raw_item_entry_missing_main() {
        let item: RawForecastItem =
            serde_json::from_str(r#"{"feels_like": 1.0, "weather": [{"id": 500}]}"#).unwrap();
        assert_eq!(item.condition_id(), 500);
        assert_eq!(item.condition_main(), "None");
    }

    #[test]
    fn test_units_symbols() {
        assert_eq!(Units::Metric.symbol(), 'c');
        assert_eq!(Units::Imperial.symbol(), 'f');
        assert_eq!(Units::Standard.symbol(), 'k');
        assert_eq!(Units::default(), Units::Metric);
    }

    #[test]
    fn test_fetch_error_retryable() {
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::BadStatus(503).is_retryable());
        assert!(FetchError::BadStatus(429).is_retryable());
        assert!(!FetchError::BadStatus(401).is_retryable());
        assert!(!FetchError::InvalidCoordinates {
            latitude: 999.0,
            longitude: 0.0
        }
        .is_retryable());
    }

    #[test]
    fn test_fetch_error_messages() {
        assert!(FetchError::BadStatus(401).user_message().contains("API key"));
        assert!(FetchError::BadStatus(404).to_string().contains("404"));
    }
}
