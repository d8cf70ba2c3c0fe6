//! Tooluse CLI - ask a tool-using model a question from the terminal.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

mod config;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use tooluse::completion::Completion;
use tooluse::prelude::*;

use crate::config::{CliConfig, ConfigError, IssueLevel};

const DEFAULT_QUESTION: &str = "What is the current weather of Guangzhou and Beijing? \
                                Do I have to bring an umbrella? And what is 1 + 1?";

/// Ask a hosted model a question and let it call local tools to answer it
#[derive(Parser)]
#[command(name = "tooluse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "TOOLUSE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one question through the tool-use loop
    Ask(AskArgs),

    /// Print the system prompt for a toolset
    Tools(ToolsArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the ask command
#[derive(Args)]
struct AskArgs {
    /// The question to ask
    question: Option<String>,

    /// Stream the model output as it is generated
    #[arg(short, long)]
    stream: bool,

    /// Tool bundle: arithmetic, weather, location-weather or full
    #[arg(short, long)]
    toolset: Option<String>,

    /// Maximum completions before giving up
    #[arg(long)]
    max_turns: Option<usize>,

    /// Model to use (overrides config)
    #[arg(short, long, env = "ANTHROPIC_MODEL")]
    model: Option<String>,

    /// Replay model output from FILE, one JSON document per line, instead of
    /// calling the API
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,
}

/// Arguments for the tools command
#[derive(Args)]
struct ToolsArgs {
    /// Tool bundle to describe
    #[arg(short, long)]
    toolset: Option<String>,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Validate configuration
    Validate,
}

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Run(#[from] tooluse::Error),
    #[error("{0}")]
    Usage(String),
}

type CliResult<T> = std::result::Result<T, CliError>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
///
/// Logs go to stderr so stdout carries only the answer.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tooluse={level},tooluse_cli={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let path = cli.config.unwrap_or_else(config::config_path);
    match cli.command {
        Commands::Ask(args) => cmd_ask(args, &path).await,
        Commands::Tools(args) => cmd_tools(args, &path).await,
        Commands::Config(args) => cmd_config(args, &path).await,
    }
}

async fn load(path: &std::path::Path) -> CliResult<CliConfig> {
    Ok(config::load_config_from(path).await?.with_env())
}

fn resolve_toolset(name: &str) -> CliResult<ToolRegistry> {
    tooluse::tools::toolset(name).ok_or_else(|| {
        CliError::Usage(format!(
            "unknown toolset '{name}', expected one of: {}",
            tooluse::tools::TOOLSET_NAMES.join(", ")
        ))
    })
}

/// Run one question.
async fn cmd_ask(args: AskArgs, path: &std::path::Path) -> CliResult<()> {
    let config = load(path).await?;

    let tools = resolve_toolset(args.toolset.as_deref().unwrap_or(&config.agent.toolset))?;
    let provider: SharedChatProvider = match &args.script {
        Some(script) => {
            let text = tokio::fs::read_to_string(script)
                .await
                .map_err(tooluse::Error::from)?;
            Arc::new(ScriptedProvider::from_lines(&text))
        }
        None => Arc::new(Anthropic::new(config.anthropic())?),
    };

    let mut agent = Agent::new(provider)
        .tools(tools)
        .sampling(config.agent.sampling())
        .retry(config.retry.policy())
        .max_turns(args.max_turns.unwrap_or(config.agent.max_turns));
    if let Some(model) = args.model {
        agent = agent.model(model);
    }

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel_with_reason("interrupted");
        }
    });

    let streaming = args.stream || config.agent.streaming;
    let mut run_config = RunConfig::new().streaming(streaming).cancel(cancel);
    if streaming {
        run_config = run_config.hooks(Arc::new(EchoHooks));
    }

    let question = args.question.as_deref().unwrap_or(DEFAULT_QUESTION);
    let result = agent.run(question, run_config).await?;
    tracing::info!("{}", result.summary());

    println!("AI: {}", result.output);
    Ok(())
}

/// Prints streamed model text as it arrives.
#[derive(Debug, Clone, Copy)]
struct EchoHooks;

#[async_trait]
impl RunHooks for EchoHooks {
    async fn on_text_delta(&self, delta: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(delta.as_bytes());
        let _ = out.flush();
    }

    async fn on_completion_retry(&self, attempt: u32, _error: &LlmError) {
        println!(" [retry {attempt}]");
    }

    async fn on_completion_end(&self, _step: usize, _completion: &Completion) {
        println!();
    }
}

/// Print the system prompt the model would see.
async fn cmd_tools(args: ToolsArgs, path: &std::path::Path) -> CliResult<()> {
    let name = match args.toolset {
        Some(name) => name,
        None => load(path).await?.agent.toolset,
    };
    let tools = resolve_toolset(&name)?;
    println!("{}", SystemPrompt::new(&tools.definitions()).render());
    Ok(())
}

/// Manage configuration.
async fn cmd_config(args: ConfigArgs, path: &std::path::Path) -> CliResult<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            let mut config = load(path).await?;
            if !config.provider.api_key.is_empty() {
                config.provider.api_key = "********".to_owned();
            }
            let text = toml::to_string_pretty(&config).map_err(ConfigError::from)?;
            println!("{text}");
        }
        ConfigCommands::Init { force } => {
            config::init_config(path, force).await?;
            println!("Configuration created: {}", path.display());
            println!();
            println!("Next steps:");
            println!("  1. export ANTHROPIC_API_KEY=<key>");
            println!("  2. tooluse ask \"What is 1 + 1?\"");
        }
        ConfigCommands::Validate => {
            let config = load(path).await?;
            let issues = config.validate();
            for issue in &issues {
                println!("{issue}");
            }
            if issues.iter().any(|i| i.level == IssueLevel::Error) {
                return Err(CliError::Usage("configuration is invalid".into()));
            }
            println!("Configuration is valid");
        }
    }
    Ok(())
}
