//! Current-weather lookup backed by the Open-Meteo public API.
//!
//! Two chained requests: geocode the city name, then fetch the current
//! conditions at the returned coordinates. No API key is needed.

use crate::config::WeatherConfig;
use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Returned in place of a report whenever any step of the lookup fails.
pub const WEATHER_APOLOGY: &str = "Sorry, couldn't fetch weather for that city. Try a different name?";

/// WMO weather interpretation codes reported by Open-Meteo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    DepositingRimeFog,
    LightDrizzle,
    ModerateDrizzle,
    DenseDrizzle,
    SlightRain,
    ModerateRain,
    HeavyRain,
    SlightSnow,
    ModerateSnow,
    HeavySnow,
    SlightRainShowers,
    ModerateRainShowers,
    ViolentRainShowers,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 => Self::Fog,
            48 => Self::DepositingRimeFog,
            51 => Self::LightDrizzle,
            53 => Self::ModerateDrizzle,
            55 => Self::DenseDrizzle,
            61 => Self::SlightRain,
            63 => Self::ModerateRain,
            65 => Self::HeavyRain,
            71 => Self::SlightSnow,
            73 => Self::ModerateSnow,
            75 => Self::HeavySnow,
            80 => Self::SlightRainShowers,
            81 => Self::ModerateRainShowers,
            82 => Self::ViolentRainShowers,
            95 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ClearSky => "clear sky",
            Self::MainlyClear => "mainly clear",
            Self::PartlyCloudy => "partly cloudy",
            Self::Overcast => "overcast",
            Self::Fog => "fog",
            Self::DepositingRimeFog => "depositing rime fog",
            Self::LightDrizzle => "light drizzle",
            Self::ModerateDrizzle => "moderate drizzle",
            Self::DenseDrizzle => "dense drizzle",
            Self::SlightRain => "slight rain",
            Self::ModerateRain => "moderate rain",
            Self::HeavyRain => "heavy rain",
            Self::SlightSnow => "slight snow",
            Self::ModerateSnow => "moderate snow",
            Self::HeavySnow => "heavy snow",
            Self::SlightRainShowers => "slight rain showers",
            Self::ModerateRainShowers => "moderate rain showers",
            Self::ViolentRainShowers => "violent rain showers",
            Self::Thunderstorm => "thunderstorm",
            Self::Unknown => "unknown conditions",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<Place>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub temperature_2m: f64,
    pub weather_code: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub country: String,
    pub temperature_c: f64,
    pub condition: WeatherCondition,
}

impl WeatherReport {
    fn new(city: &str, place: &Place, current: &CurrentWeather) -> Self {
        Self {
            city: city.to_string(),
            country: place.country.clone().unwrap_or_else(|| "Unknown".to_string()),
            temperature_c: current.temperature_2m,
            condition: WeatherCondition::from_code(current.weather_code),
        }
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "In {}, {}, it's currently {} with a temperature of {:.1}°C.",
            self.city, self.country, self.condition, self.temperature_c
        )
    }
}

fn first_place(response: GeocodingResponse, city: &str) -> Result<Place> {
    response
        .results
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| anyhow!("No geocoding results for '{}'", city))
}

pub struct OpenMeteoClient {
    client: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        Self::from_config(&WeatherConfig::default())
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(30)))
            .build()
            .unwrap_or_default();

        Self {
            client,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
        }
    }

    pub async fn geocode(&self, city: &str) -> Result<Place> {
        let response = self
            .client
            .get(&self.geocoding_url)
            .query(&[
                ("name", city),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Geocoding request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Geocoding API error ({})", response.status()));
        }

        let body: GeocodingResponse = response
            .json()
            .await
            .context("Failed to decode geocoding response")?;

        first_place(body, city)
    }

    pub async fn current(&self, place: &Place) -> Result<CurrentWeather> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current", "temperature_2m,weather_code".to_string()),
                ("temperature_unit", "celsius".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .context("Forecast request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Forecast API error ({})", response.status()));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .context("Failed to decode forecast response")?;

        Ok(body.current)
    }

    pub async fn lookup(&self, city: &str) -> Result<WeatherReport> {
        let place = self.geocode(city).await?;
        debug!(city, lat = place.latitude, lon = place.longitude, "geocoded city");
        let current = self.current(&place).await?;
        Ok(WeatherReport::new(city, &place, &current))
    }

    /// One-sentence summary for `city`, or [`WEATHER_APOLOGY`] on any failure.
    pub async fn describe(&self, city: &str) -> String {
        match self.lookup(city).await {
            Ok(report) => report.to_string(),
            Err(e) => {
                warn!(city, error = %format!("{e:#}"), "weather lookup failed");
                WEATHER_APOLOGY.to_string()
            }
        }
    }
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WeatherTool {
    client: OpenMeteoClient,
}

impl WeatherTool {
    pub fn new(client: OpenMeteoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. 'Paris'"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let city = extract_string_arg(&args, "city")?;
        Ok(ToolResult::success(self.client.describe(&city).await))
    }
}
