use anyhow::{Context, Result};
use breeze_core::{agent, config, providers, tools};
use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod onboard;

#[derive(Parser)]
#[command(name = "breeze")]
#[command(about = "breeze - a small chat agent that can check the weather", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG and the config
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive setup; writes ~/.breeze/config.toml
    Onboard,
    /// Chat with the agent, or send a single message with --message
    Chat {
        #[arg(short, long)]
        message: Option<String>,
    },
}

fn setup_logging(cli_level: Option<&str>, config_level: Option<&str>) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config_level.unwrap_or("warn"))),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_agent(config: &config::Config) -> Result<agent::AgentLoop> {
    let provider = providers::create_provider(config)?;
    debug!(provider = provider.name(), model = %config.model, "provider ready");

    let mut tool_registry = agent::ToolRegistry::new();
    tool_registry.register(Box::new(tools::WeatherTool::new(
        tools::OpenMeteoClient::from_config(&config.weather),
    )));

    let context_builder = agent::ContextBuilder::new().with_workspace(&config.workspace_dir);

    Ok(
        agent::AgentLoop::new(Arc::from(provider), context_builder, Arc::new(tool_registry))
            .with_max_iterations(config.max_iterations)
            .with_max_history(config.max_history),
    )
}

#[derive(Debug, PartialEq)]
enum ReplInput<'a> {
    Exit,
    Skip,
    Message(&'a str),
}

fn classify(line: &str) -> ReplInput<'_> {
    let input = line.trim();
    if input.eq_ignore_ascii_case("exit") {
        ReplInput::Exit
    } else if input.is_empty() {
        ReplInput::Skip
    } else {
        ReplInput::Message(input)
    }
}

async fn run_repl(agent_loop: &agent::AgentLoop) -> Result<()> {
    let mut session = agent::Session::new();
    let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;

    println!("Chat with the agent (type 'exit' to quit):");

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let input = match classify(&line) {
            ReplInput::Exit => break,
            ReplInput::Skip => continue,
            ReplInput::Message(input) => input,
        };
        let _ = editor.add_history_entry(input);

        match agent_loop.process(&mut session, input).await {
            Ok(output) => println!("Agent: {}", output),
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    debug!(turns = session.len(), "session closed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat { message: None }) {
        Commands::Onboard => {
            setup_logging(cli.log_level.as_deref(), None);
            let onboard_config = onboard::run_onboard().context("Onboarding failed")?;
            config::save_config(&onboard_config)?;
        }
        Commands::Chat { message } => {
            let config = config::Config::load_or_init()?;
            setup_logging(cli.log_level.as_deref(), config.log_level.as_deref());

            let agent_loop = build_agent(&config)?;

            if let Some(msg) = message {
                let mut session = agent::Session::new();
                let output = agent_loop.process(&mut session, &msg).await?;
                println!("Agent: {}", output);
            } else {
                run_repl(&agent_loop).await?;
            }
        }
    }

    Ok(())
}
