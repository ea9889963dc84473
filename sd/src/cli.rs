//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::llm::ModelKind;

/// specdraft - section-by-section specification drafting
#[derive(Parser)]
#[command(
    name = "sd",
    about = "Draft a multi-section specification by chatting with an AI, one section at a time",
    version,
    after_help = "Logs are written to: ~/.local/share/specdraft/logs/specdraft.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive drafting session (default)
    Chat {
        /// Model to draft with (claude, gpt)
        #[arg(short, long)]
        model: Option<ModelKind>,

        /// Completion server URL; overrides service.remote-url
        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Parse a hand-edited document and show the sections found
    Parse {
        /// Document file to parse
        file: PathBuf,
    },

    /// List the configured sections
    Sections,
}

/// Path of the log file written by `sd`
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("specdraft")
        .join("logs")
        .join("specdraft.log");
    debug!(?path, "get_log_path: returning path");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["sd"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_chat_with_model() {
        let cli = Cli::parse_from(["sd", "chat", "--model", "gpt", "--remote", "http://localhost:3001"]);
        match cli.command {
            Some(Command::Chat { model, remote }) => {
                assert_eq!(model, Some(ModelKind::Gpt));
                assert_eq!(remote.as_deref(), Some("http://localhost:3001"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_model() {
        assert!(Cli::try_parse_from(["sd", "chat", "--model", "llama"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sd", "parse", "doc.md", "--log-level", "debug", "-c", "cfg.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("cfg.yml")));
        assert!(matches!(cli.command, Some(Command::Parse { file }) if file == PathBuf::from("doc.md")));
    }

    #[test]
    fn test_log_path_location() {
        let path = get_log_path();
        assert!(path.ends_with("specdraft/logs/specdraft.log"));
    }
}
