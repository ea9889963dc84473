//! sd - specdraft command line
//!
//! Interactive drafting plus a couple of offline helpers.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use specdraft::cli::{Cli, Command, get_log_path};
use specdraft::completion::{CompletionService, HttpCompletionService, LlmCompletionService};
use specdraft::config::Config;
use specdraft::credentials::EnvCredentials;
use specdraft::document::parse_document;
use specdraft::llm::ModelKind;
use specdraft::orchestrator::Orchestrator;
use specdraft::repl::ReplSession;
use specdraft::session::{Session, SessionManager};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("specdraft loaded config: default={}", config.llm.default);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Chat { model, remote }) => cmd_chat(&config, model, remote).await,
        Some(Command::Parse { file }) => cmd_parse(&file),
        Some(Command::Sections) => cmd_sections(&config),
        None => cmd_chat(&config, None, None).await,
    }
}

async fn cmd_chat(config: &Config, model: Option<ModelKind>, remote: Option<String>) -> Result<()> {
    let model = model.unwrap_or(config.llm.default);
    debug!(%model, ?remote, "cmd_chat: called");

    let service: Arc<dyn CompletionService> = match remote.or_else(|| config.service.remote_url.clone()) {
        Some(url) => {
            info!(%url, "cmd_chat: using remote completion service");
            Arc::new(HttpCompletionService::new(&url, config.service.timeout_ms)?)
        }
        None => {
            info!("cmd_chat: calling providers directly");
            Arc::new(LlmCompletionService::new(config.llm.clone()))
        }
    };

    let session = SessionManager::spawn(Session::new(config.sections.clone(), model, config.compile_mode(model)));
    let credentials = Arc::new(EnvCredentials::from_config(&config.llm));
    let orchestrator = Orchestrator::new(session.clone(), service, credentials);

    let mut repl = ReplSession::new(orchestrator);
    let result = repl.run().await;
    let _ = session.shutdown().await;
    result
}

fn cmd_parse(file: &Path) -> Result<()> {
    debug!(file = %file.display(), "cmd_parse: called");
    let text = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;

    let parsed = parse_document(&text);
    if parsed.is_empty() {
        println!("{}", "No sections found.".dimmed());
        return Ok(());
    }

    for chunk in parsed {
        println!("{}", format!("[{}]", chunk.section).bright_cyan());
        println!("{}", chunk.content);
        println!();
    }
    Ok(())
}

fn cmd_sections(config: &Config) -> Result<()> {
    debug!("cmd_sections: called");
    for section in config.sections.iter() {
        println!("{:14} {}", section.id().yellow(), section.label);
        println!("{:14} {}", "", section.placeholder.dimmed());
    }
    Ok(())
}
