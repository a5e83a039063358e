//! stylechat - restyle a button by chatting with a language model.
//!
//! Each command typed into the chat panel is sent, together with the current
//! style state, to a chat-completion endpoint; the JSON object it answers with
//! becomes the button's new style.

mod completion;
mod config;
mod protocol;
mod style;
mod transcript;
mod ui;
mod widget;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use completion::{CompletionBackend, OpenAIClient};
use config::{Config, Overrides};
use std::fs::OpenOptions;
use std::process::Command as ProcessCommand;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use widget::{Outcome, Widget};

#[derive(Parser)]
#[command(name = "stylechat")]
#[command(author, version, about = "Restyle a button by chatting with a language model")]
#[command(long_about = "Opens a preview of a button and a chat panel. Type commands such as \
                        \"make it red\" and the model rewrites the button's styles.\n\n\
                        Press Tab to open the chat panel.")]
struct Cli {
    /// Style command (prefills the chat panel, or runs directly with --pipe)
    #[arg(value_name = "COMMAND")]
    command: Option<String>,

    /// No TUI: run one command and print the resulting styles as JSON
    #[arg(long)]
    pipe: bool,

    /// Override the model from the config file
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Override the chat-completion endpoint URL
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Log debug output (including raw completion responses)
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    subcommand: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open configuration file in $EDITOR
    Config,
    /// Print the configured initial styles
    Styles,
    /// Print the request body a command would send, without sending it
    Prompt {
        /// Style command to build the request for
        command: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = Overrides {
        model: cli.model,
        endpoint: cli.endpoint,
    };

    match cli.subcommand {
        Some(Commands::Config) => handle_config(),
        Some(Commands::Styles) => handle_styles(),
        Some(Commands::Prompt { command }) => handle_prompt(&command, overrides),
        None => {
            let config = Config::load()
                .context("Failed to load configuration")?
                .with_overrides(overrides);
            if cli.pipe {
                init_logging(cli.verbose, LogTarget::Stderr)?;
                handle_pipe(config, cli.command).await
            } else {
                init_logging(cli.verbose, LogTarget::File)?;
                handle_widget(config, cli.command).await
            }
        }
    }
}

enum LogTarget {
    Stderr,
    File,
}

/// Initialize logging.
///
/// The interactive widget owns the terminal, so its logs go to a file in the
/// config directory instead of stderr.
fn init_logging(verbose: bool, target: LogTarget) -> Result<()> {
    let level = match (verbose, &target) {
        (true, _) => "debug",
        (false, LogTarget::Stderr) => "warn",
        (false, LogTarget::File) => "info",
    };
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(rust_log.as_deref(), verbose, level)?;

    match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogTarget::File => {
            let path = Config::log_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
    }
    Ok(())
}

/// Build the log filter.
///
/// A non-empty `RUST_LOG` replaces the defaults entirely; `-v` still raises
/// stylechat to debug on top of it.
fn log_filter(rust_log: Option<&str>, verbose: bool, level: &str) -> Result<EnvFilter> {
    let filter = match rust_log.filter(|directives| !directives.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid {}: {}", EnvFilter::DEFAULT_ENV, directives))?,
        None => EnvFilter::try_new(format!("stylechat={},reqwest=warn", level))?,
    };
    Ok(if verbose {
        filter.add_directive("stylechat=debug".parse()?)
    } else {
        filter
    })
}

/// Run the interactive widget.
async fn handle_widget(config: Config, initial_command: Option<String>) -> Result<()> {
    let client = OpenAIClient::new(config.completion.clone())?;
    if let Err(e) = client.health_check() {
        warn!("{}", e);
    }
    info!(
        "Starting widget (model: {}, endpoint: {})",
        client.model(),
        config.completion.endpoint
    );

    let backend: Arc<dyn CompletionBackend> = Arc::new(client);
    let widget = Widget::new(config.style.initial);
    let widget = ui::run_tui(widget, backend, initial_command).await?;

    info!(
        "Widget closed after {} command(s)",
        widget.transcript().len() / 2
    );
    Ok(())
}

/// Run a single command without the TUI.
///
/// The resulting styles go to stdout and the assistant's reply to stderr, so
/// the JSON can be piped elsewhere.
async fn handle_pipe(config: Config, command: Option<String>) -> Result<()> {
    let command = command.ok_or_else(|| anyhow!("Command required in --pipe mode"))?;
    let client = OpenAIClient::new(config.completion)?;
    let mut widget = Widget::new(config.style.initial);

    let Some(outcome) = widget.submit(&client, &command).await else {
        bail!("Command must not be empty");
    };

    if let Some(reply) = widget.transcript().last() {
        eprintln!("{}", reply.content);
    }
    println!("{}", widget.styles().to_pretty_json());

    if outcome.is_updated() {
        return Ok(());
    }
    if let Outcome::Failed(e) = outcome {
        eprintln!("Error: {}", e);
    }
    std::process::exit(1);
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    // Create default config if it doesn't exist
    if !config_path.exists() {
        Config::default().save()?;
        println!("Created default config at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}

/// Handle the styles command.
fn handle_styles() -> Result<()> {
    let config = Config::load()?;
    println!("{}", config.style.initial.to_pretty_json());
    Ok(())
}

/// Handle the prompt command.
fn handle_prompt(command: &str, overrides: Overrides) -> Result<()> {
    let config = Config::load()?.with_overrides(overrides);
    let request = completion::build_request(&config.completion, &config.style.initial, command);
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}
