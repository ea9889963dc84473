//! Interactive drafting REPL
//!
//! Plain lines are submitted to the active section; slash commands manage
//! sections and the document.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use eyre::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{Role, Section, SectionEdit, SectionRegistry};
use crate::orchestrator::{Orchestrator, Submission};
use crate::session::{SessionManager, SessionView, SubmitOutcome};

/// Parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Quit,
    Tab(String),
    Sections,
    Add(String),
    Remove(String),
    Rename { id: String, label: String },
    Doc,
    History,
    Edit(PathBuf),
    Save(PathBuf),
    /// Recognized command with a missing argument; holds the usage line
    Usage(&'static str),
    Unknown(String),
}

impl SlashCommand {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (cmd, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
        let rest = rest.trim();

        match cmd {
            "/help" | "/h" => Self::Help,
            "/quit" | "/q" | "/exit" => Self::Quit,
            "/tab" => with_arg(rest, "/tab <id>", |r| SlashCommand::Tab(r.to_string())),
            "/sections" => Self::Sections,
            "/add" => with_arg(rest, "/add <label>", |r| SlashCommand::Add(r.to_string())),
            "/remove" => with_arg(rest, "/remove <id>", |r| SlashCommand::Remove(r.to_string())),
            "/rename" => match rest.split_once(char::is_whitespace) {
                Some((id, label)) if !label.trim().is_empty() => Self::Rename {
                    id: id.to_string(),
                    label: label.trim().to_string(),
                },
                _ => Self::Usage("/rename <id> <label>"),
            },
            "/doc" => Self::Doc,
            "/history" => Self::History,
            "/edit" => with_arg(rest, "/edit <file>", |r| SlashCommand::Edit(PathBuf::from(r))),
            "/save" => with_arg(rest, "/save <file>", |r| SlashCommand::Save(PathBuf::from(r))),
            other => Self::Unknown(other.to_string()),
        }
    }
}

fn with_arg(rest: &str, usage: &'static str, build: impl FnOnce(&str) -> SlashCommand) -> SlashCommand {
    if rest.is_empty() {
        SlashCommand::Usage(usage)
    } else {
        build(rest)
    }
}

/// Interactive REPL session
pub struct ReplSession {
    session: SessionManager,
    inbox: mpsc::Sender<Submission>,
}

impl ReplSession {
    /// Create a REPL that submits through the orchestrator's inbox
    pub fn new(orchestrator: Orchestrator) -> Self {
        let session = orchestrator.session().clone();
        let (inbox, rx) = mpsc::channel(16);
        tokio::spawn(orchestrator.serve(rx));
        Self { session, inbox }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome().await?;

        // Create readline editor for proper line editing
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let view = self.session.view().await?;
            let prompt = format!("{} {} ", view.active.bright_cyan(), ">".bright_green());

            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(SlashCommand::parse(input)).await {
                            Ok(SlashResult::Continue) => continue,
                            Ok(SlashResult::Quit) => break,
                            Err(e) => println!("{} {:#}", "Error:".red(), e),
                        }
                    } else {
                        self.submit(&view.active, input).await?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn print_welcome(&self) -> Result<()> {
        let view = self.session.view().await?;
        println!();
        println!("{}", "specdraft".bright_cyan().bold());
        println!("Model: {}", view.model.to_string().yellow());
        print_sections(&view);
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
        Ok(())
    }

    /// Send a message through the inbox and show the reply
    async fn submit(&self, section: &str, message: &str) -> Result<()> {
        debug!(%section, "ReplSession::submit: called");
        let (submission, reply) = Submission::with_reply(Some(section.to_string()), message);
        self.inbox
            .send(submission)
            .await
            .map_err(|_| eyre::eyre!("Orchestrator stopped"))?;
        println!("{}", "thinking...".dimmed());

        let outcome = reply.await.context("Orchestrator dropped the request")??;
        let view = self.session.view().await?;
        let last = view.store.turns(section).last().filter(|t| t.role == Role::Assistant);

        match &outcome {
            SubmitOutcome::Ignored => {}
            SubmitOutcome::Busy => println!("{}", format!("[{} is still waiting for a reply]", section).yellow()),
            SubmitOutcome::Discarded => println!("{}", "[section was removed; reply discarded]".dimmed()),
            SubmitOutcome::MissingCredential | SubmitOutcome::Failed => {
                if let Some(turn) = last {
                    println!("{}", turn.content.red());
                }
            }
            SubmitOutcome::Succeeded { handoff } => {
                if let Some(turn) = last {
                    println!("{}", turn.content.bright_white());
                    if let Some(confidence) = turn.confidence {
                        println!("{}", format!("confidence: {:.2}", confidence).dimmed());
                    }
                }
                if let Some(target) = handoff {
                    println!("{}", format!("[moved to {}]", target).bright_cyan());
                }
            }
        }
        println!();
        Ok(())
    }

    async fn handle_slash_command(&mut self, cmd: SlashCommand) -> Result<SlashResult> {
        debug!(?cmd, "handle_slash_command: called");
        match cmd {
            SlashCommand::Help => print_help(),
            SlashCommand::Quit => return Ok(SlashResult::Quit),
            SlashCommand::Tab(id) => {
                self.session.select_section(&id).await?;
            }
            SlashCommand::Sections => {
                print_sections(&self.session.view().await?);
            }
            SlashCommand::Add(label) => {
                let view = self.session.view().await?;
                let section = section_for_label(&view.registry, label);
                let id = section.id().to_string();
                self.session.add_section(section).await?;
                println!("{}", format!("Added section {}", id).dimmed());
            }
            SlashCommand::Remove(id) => {
                self.session.remove_section(&id).await?;
                println!("{}", format!("Removed section {} and its history", id).dimmed());
            }
            SlashCommand::Rename { id, label } => {
                self.session.edit_section(&id, SectionEdit::rename(label)).await?;
            }
            SlashCommand::Doc => {
                let view = self.session.view().await?;
                if view.document.is_empty() {
                    println!("{}", "The document is empty.".dimmed());
                } else {
                    println!();
                    println!("{}", view.document);
                    println!();
                }
            }
            SlashCommand::History => {
                print_history(&self.session.view().await?);
            }
            SlashCommand::Edit(path) => {
                let text = fs::read_to_string(&path).context(format!("Failed to read {}", path.display()))?;
                let outcome = self.session.apply_edited_document(&text).await?;
                println!("{}", format!("Updated: {}", outcome.applied.join(", ")).dimmed());
                if !outcome.unknown.is_empty() {
                    println!(
                        "{} {}",
                        "Ignored unknown sections:".yellow(),
                        outcome.unknown.join(", ")
                    );
                }
            }
            SlashCommand::Save(path) => {
                let view = self.session.view().await?;
                fs::write(&path, &view.document).context(format!("Failed to write {}", path.display()))?;
                println!("{}", format!("Saved document to {}", path.display()).dimmed());
            }
            SlashCommand::Usage(usage) => println!("Usage: {}", usage.yellow()),
            SlashCommand::Unknown(cmd) => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        Ok(SlashResult::Continue)
    }
}

/// Section for `/add`: the id comes from the label unless that id is
/// unusable or taken, in which case a drafted id is used
fn section_for_label(registry: &SectionRegistry, label: String) -> Section {
    match Section::from_label(label.clone()) {
        Ok(section) if !registry.contains(section.id()) => section,
        _ => {
            debug!(%label, "section_for_label: falling back to a drafted id");
            let mut draft = registry.draft_section();
            draft.label = label;
            draft
        }
    }
}

fn print_help() {
    println!();
    println!("{}", "Available Commands:".bright_cyan());
    println!("  {:22} Show this help", "/help".yellow());
    println!("  {:22} Exit the REPL", "/quit".yellow());
    println!("  {:22} Switch to a section", "/tab <id>".yellow());
    println!("  {:22} List sections", "/sections".yellow());
    println!("  {:22} Add a section", "/add <label>".yellow());
    println!("  {:22} Remove a section and its history", "/remove <id>".yellow());
    println!("  {:22} Rename a section", "/rename <id> <label>".yellow());
    println!("  {:22} Show the document", "/doc".yellow());
    println!("  {:22} Show the active section's history", "/history".yellow());
    println!("  {:22} Load a hand-edited document", "/edit <file>".yellow());
    println!("  {:22} Write the document to a file", "/save <file>".yellow());
    println!();
}

fn print_sections(view: &SessionView) {
    for section in view.registry.iter() {
        let marker = if section.id() == view.active { "*" } else { " " };
        let pending = if view.pending.iter().any(|p| p == section.id()) {
            " (waiting)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            " {} {:14} {}{}",
            marker.bright_green(),
            section.id().yellow(),
            section.label,
            pending
        );
    }
}

fn print_history(view: &SessionView) {
    let turns = view.store.turns(&view.active);
    if turns.is_empty() {
        println!("{}", "No conversation history.".dimmed());
        return;
    }

    println!();
    println!("{}", format!("History for {}:", view.active).bright_cyan());
    for (i, turn) in turns.iter().enumerate() {
        let role = match turn.role {
            Role::User => "User".bright_green(),
            Role::Assistant => "Assistant".bright_blue(),
        };
        let preview: String = turn.content.chars().take(60).collect();
        let preview = if turn.content.chars().count() > 60 {
            format!("{}...", preview)
        } else {
            preview
        };
        println!("  {}. {}: {}", i + 1, role, preview);
    }
    println!();
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_section_ids() {
        let registry = SectionRegistry::default();

        let fresh = section_for_label(&registry, "Security Review".to_string());
        assert_eq!(fresh.id(), "security");

        let taken = section_for_label(&registry, "Acceptance Tests".to_string());
        assert_eq!(taken.id(), "sectione");
        assert_eq!(taken.label, "Acceptance Tests");

        let invalid = section_for_label(&registry, "42".to_string());
        assert_eq!(invalid.id(), "sectione");
        assert_eq!(invalid.label, "42");
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(SlashCommand::parse("/help"), SlashCommand::Help);
        assert_eq!(SlashCommand::parse("/q"), SlashCommand::Quit);
        assert_eq!(SlashCommand::parse("/doc"), SlashCommand::Doc);
        assert_eq!(SlashCommand::parse("/sections"), SlashCommand::Sections);
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(SlashCommand::parse("/tab technical"), SlashCommand::Tab("technical".to_string()));
        assert_eq!(
            SlashCommand::parse("/add  Security Review "),
            SlashCommand::Add("Security Review".to_string())
        );
        assert_eq!(
            SlashCommand::parse("/rename acceptance Done When"),
            SlashCommand::Rename {
                id: "acceptance".to_string(),
                label: "Done When".to_string()
            }
        );
        assert_eq!(SlashCommand::parse("/save spec.md"), SlashCommand::Save(PathBuf::from("spec.md")));
    }

    #[test]
    fn test_parse_missing_arguments() {
        assert_eq!(SlashCommand::parse("/tab"), SlashCommand::Usage("/tab <id>"));
        assert_eq!(SlashCommand::parse("/rename acceptance"), SlashCommand::Usage("/rename <id> <label>"));
        assert_eq!(SlashCommand::parse("/edit   "), SlashCommand::Usage("/edit <file>"));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(SlashCommand::parse("/frobnicate now"), SlashCommand::Unknown("/frobnicate".to_string()));
    }
}
