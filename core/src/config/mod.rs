use crate::tools::weather::{DEFAULT_FORECAST_URL, DEFAULT_GEOCODING_URL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const BREEZE_DIR: &str = ".breeze";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_iterations: usize,
    pub max_history: usize,
    pub log_level: Option<String>,
    pub weather: WeatherConfig,
    #[serde(skip)]
    pub workspace_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "llama3.2:1b".to_string(),
            temperature: 0.2,
            max_iterations: 3,
            max_history: 0,
            log_level: None,
            weather: WeatherConfig::default(),
            workspace_dir: get_breeze_dir().join("workspace"),
        }
    }
}

pub fn get_breeze_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(BREEZE_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_breeze_dir().join("config.toml")
}

pub fn ensure_breeze_dir() -> Result<PathBuf> {
    let breeze_dir = get_breeze_dir();

    if !breeze_dir.exists() {
        std::fs::create_dir_all(&breeze_dir).with_context(|| {
            format!(
                "Failed to create breeze directory at {}",
                breeze_dir.display()
            )
        })?;
    }

    Ok(breeze_dir)
}

impl Config {
    /// Loads the config file, or falls back to defaults when there is none.
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or("ollama")
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'breeze onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.workspace_dir = config_path
        .parent()
        .map(|dir| dir.join("workspace"))
        .unwrap_or_else(|| get_breeze_dir().join("workspace"));

    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_breeze_dir()?;
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
