//! Forecast classification: provider condition codes to matrix icon and label.
//!
//! The rules run as an ordered chain and each one may replace the category
//! chosen by the ones before it:
//!
//! 1. no condition entry: `"None"`, code 0
//! 2. otherwise the first entry's main label and code
//! 3. code overrides: 771 windy, 871 tornado, 701..=769 foggy
//! 4. `Clouds` splits on code 804 into partly cloudy / cloudy
//! 5. codes 603..=619 are sleet, whatever came before
//! 6. `Drizzle` becomes `lightrain`
//! 7. `Clear` gains a day or night suffix from the icon hint
//!
//! See: https://openweathermap.org/weather-conditions

use crate::types::{DisplayState, IconKey, RawForecastItem};

/// Day or night, taken from the provider's icon code (`01d` / `01n`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diurnal {
    Day,
    Night,
}

impl Diurnal {
    /// Only a trailing `n` on the first dot-separated segment means night;
    /// a missing or empty hint counts as day.
    pub fn from_icon_hint(hint: Option<&str>) -> Self {
        let last = hint
            .and_then(|h| h.split('.').next())
            .and_then(|segment| segment.chars().last());
        match last {
            Some('n') => Self::Night,
            _ => Self::Day,
        }
    }
}

/// Intermediate result of the rule chain
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionCategory {
    /// Main label passed through untouched
    Named(String),
    Windy,
    Tornado,
    Foggy,
    PartlyCloudy,
    Cloudy,
    Sleet,
    /// Drizzle keeps the icon name as its label
    LightRain,
    Clear(Diurnal),
}

impl ConditionCategory {
    /// Run the rule chain. Later rules take precedence over earlier ones.
    pub fn resolve(condition_id: i32, condition_main: &str, diurnal: Diurnal) -> Self {
        let mut category = match condition_id {
            771 => Self::Windy,
            871 => Self::Tornado,
            701..=769 => Self::Foggy,
            _ => Self::Named(condition_main.to_string()),
        };

        if category.is_named("Clouds") {
            category = if condition_id < 804 {
                Self::PartlyCloudy
            } else {
                Self::Cloudy
            };
        }

        if (603..=619).contains(&condition_id) {
            category = Self::Sleet;
        }

        if category.is_named("Drizzle") {
            category = Self::LightRain;
        }

        if category.is_named("Clear") {
            category = Self::Clear(diurnal);
        }

        category
    }

    fn is_named(&self, name: &str) -> bool {
        matches!(self, Self::Named(n) if n == name)
    }

    /// Label text as shown on the matrix (before capitalisation)
    pub fn label(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Windy => "Windy".to_string(),
            Self::Tornado => "Tornado".to_string(),
            Self::Foggy => "Foggy".to_string(),
            Self::PartlyCloudy => "Partly cloudy".to_string(),
            Self::Cloudy => "Cloudy".to_string(),
            Self::Sleet => "Sleet".to_string(),
            Self::LightRain => "lightrain".to_string(),
            Self::Clear(Diurnal::Day) => "Clear day".to_string(),
            Self::Clear(Diurnal::Night) => "Clear night".to_string(),
        }
    }

    pub fn icon_key(&self) -> IconKey {
        match self {
            Self::Named(name) => IconKey::from_key(&name.to_lowercase()),
            Self::Windy => IconKey::Wind,
            Self::Tornado => IconKey::Tornado,
            Self::Foggy => IconKey::Fog,
            Self::PartlyCloudy => IconKey::PartlyCloudy,
            Self::Cloudy => IconKey::Cloudy,
            Self::Sleet => IconKey::Sleet,
            Self::LightRain => IconKey::LightRain,
            Self::Clear(Diurnal::Day) => IconKey::ClearDay,
            Self::Clear(Diurnal::Night) => IconKey::ClearNight,
        }
    }
}

/// Convert a raw forecast item into what the matrix should show.
pub fn classify(item: &RawForecastItem) -> DisplayState {
    let category = ConditionCategory::resolve(
        item.condition_id(),
        item.condition_main(),
        Diurnal::from_icon_hint(item.icon_hint()),
    );

    DisplayState {
        icon_key: category.icon_key(),
        label: category.label(),
        temperature: item.feels_like_temp(),
    }
}
