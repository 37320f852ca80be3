use crate::config::Config;
use crate::providers::{OllamaProvider, OpenAIProvider};
use crate::traits::Provider;
use anyhow::{Result, anyhow};

pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let provider_name = config.provider_name();

    match provider_name.to_lowercase().as_str() {
        "ollama" => {
            let mut provider = OllamaProvider::new()
                .with_model(config.model.clone())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Box::new(provider))
        }
        "openai" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "BREEZE_OPENAI_API_KEY"],
                &config.api_key,
            )?;
            let mut provider = OpenAIProvider::new(api_key)
                .with_model(config.model.clone())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Box::new(provider))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: ollama, openai",
            provider_name
        )),
    }
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.is_empty()
        {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set {} or add api_key to the config.",
            env_vars.join(" or ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_is_the_default() {
        let provider = create_provider(&Config::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn provider_names_are_case_insensitive() {
        let config = Config {
            provider: Some("Ollama".into()),
            ..Default::default()
        };
        assert_eq!(create_provider(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn openai_uses_configured_key() {
        let config = Config {
            provider: Some("openai".into()),
            api_key: "sk-test".into(),
            ..Default::default()
        };
        assert_eq!(create_provider(&config).unwrap().name(), "openai");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = Config {
            provider: Some("carrier-pigeon".into()),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown provider: carrier-pigeon"));
    }

    #[test]
    fn config_key_is_the_fallback() {
        let key = resolve_api_key_with_fallback(&["BREEZE_TEST_UNSET_KEY_VAR"], "from-config");
        assert_eq!(key.unwrap(), "from-config");
        assert!(resolve_api_key_with_fallback(&["BREEZE_TEST_UNSET_KEY_VAR"], "").is_err());
    }
}
