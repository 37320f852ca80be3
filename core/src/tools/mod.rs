use serde_json::Value;

pub mod weather;

pub use weather::{OpenMeteoClient, WEATHER_APOLOGY, WeatherCondition, WeatherReport, WeatherTool};

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}
