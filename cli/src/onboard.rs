use anyhow::{Context, Result};
use breeze_core::agent::context::{DEFAULT_PERSONA, PERSONA_FILE};
use breeze_core::config::Config;
use console::style;
use dialoguer::{Input, Select};
use std::path::Path;

const PROVIDERS: &[&str] = &["ollama", "openai"];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn ensure_file(path: &Path, content: &str) -> Result<bool> {
    if !path.exists() {
        std::fs::write(path, content)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn setup_provider() -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your model provider")
        .items(PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection].to_string())
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "gpt-4o-mini",
        _ => "llama3.2:1b",
    }
}

fn setup_model(provider: &str) -> Result<String> {
    Input::new()
        .with_prompt("Model")
        .default(default_model(provider).to_string())
        .interact_text()
        .context("Failed to read model")
}

fn setup_connection(provider: &str) -> Result<(String, Option<String>)> {
    match provider {
        "openai" => {
            let api_key: String = Input::new()
                .with_prompt("API key (leave empty to use OPENAI_API_KEY)")
                .allow_empty(true)
                .interact_text()
                .context("Failed to read API key")?;
            let base_url: String = Input::new()
                .with_prompt("Base URL (leave empty for api.openai.com)")
                .allow_empty(true)
                .interact_text()
                .context("Failed to read base URL")?;
            Ok((api_key, (!base_url.is_empty()).then_some(base_url)))
        }
        _ => {
            let base_url: String = Input::new()
                .with_prompt("Ollama URL")
                .default("http://localhost:11434".to_string())
                .interact_text()
                .context("Failed to read Ollama URL")?;
            Ok((String::new(), Some(base_url)))
        }
    }
}

fn create_persona_file(workspace: &Path) -> Result<bool> {
    std::fs::create_dir_all(workspace)?;
    ensure_file(&workspace.join(PERSONA_FILE), DEFAULT_PERSONA)
}

pub fn run_onboard() -> Result<Config> {
    println!("  {}", style("Welcome to breeze!").white().bold());
    println!(
        "  {}",
        style("This wizard picks a model for your weather-savvy chat agent.").dim()
    );

    print_step(1, 3, "Provider");
    let provider = setup_provider()?;

    print_step(2, 3, "Model & Connection");
    let model = setup_model(&provider)?;
    let (api_key, base_url) = setup_connection(&provider)?;

    let config = Config {
        provider: Some(provider),
        api_key,
        base_url,
        model,
        ..Default::default()
    };

    print_step(3, 3, "Workspace Setup");
    match create_persona_file(&config.workspace_dir) {
        Ok(created) => {
            let verb = if created { "created" } else { "kept" };
            println!(
                "  {} {} {}",
                style("✓").green(),
                style(config.workspace_dir.join(PERSONA_FILE).display()).cyan(),
                verb
            );
        }
        Err(e) => eprintln!(
            "  {} Warning: Could not create {}: {}",
            style("!").yellow(),
            PERSONA_FILE,
            e
        ),
    }

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(breeze_core::config::get_config_path().display()).cyan()
    );
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("breeze chat").cyan().bold()
    );
    println!();

    Ok(config)
}
