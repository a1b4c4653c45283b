//! Interactive makeover session.
//!
//! Generation and edits run in the background, so slot edits, undo and redo
//! keep working while a request is in flight.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::bootstrap;
use makeover_application::MakeoverUseCase;
use makeover_core::orchestrator::CompletionOutcome;
use makeover_core::snapshot::CompositionSnapshot;
use makeover_execution::GenerationEvent;

const COMMANDS: &[(&str, &str)] = &[
    ("/upload", "FILE...    replace all slots (portrait, elements, vibe in order)"),
    ("/set", "N FILE     put an image in slot N (0-6)"),
    ("/clear", "N          empty slot N"),
    ("/generate", "           generate (or regenerate) the makeover"),
    ("/edit", "TEXT       apply an edit to the displayed result"),
    ("/undo", "           step back in history"),
    ("/redo", "           step forward in history"),
    ("/start-over", "           empty everything"),
    ("/reuse", "           use the result as vibe reference in a new session"),
    ("/download", "[DIR]      save the displayed result"),
    ("/status", "           show slots, history and state"),
    ("/dismiss", "           clear the error message"),
    ("/help", "           show this help"),
];

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Upload(Vec<PathBuf>),
    Set(usize, PathBuf),
    Clear(usize),
    Generate,
    Edit(String),
    Undo,
    Redo,
    StartOver,
    Reuse,
    Download(Option<PathBuf>),
    Status,
    Dismiss,
    Help,
    Quit,
}

fn parse_slot_index(arg: Option<&str>) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| "Missing slot number".to_string())?;
    arg.parse::<usize>()
        .map_err(|_| format!("Invalid slot number: {}", arg))
}

fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Ok(ReplCommand::Quit);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    match name {
        "/upload" => {
            let files: Vec<PathBuf> = args.map(PathBuf::from).collect();
            if files.is_empty() {
                return Err("Usage: /upload FILE...".to_string());
            }
            Ok(ReplCommand::Upload(files))
        }
        "/set" => {
            let index = parse_slot_index(args.next())?;
            let file = args
                .next()
                .ok_or_else(|| "Usage: /set N FILE".to_string())?;
            Ok(ReplCommand::Set(index, PathBuf::from(file)))
        }
        "/clear" => Ok(ReplCommand::Clear(parse_slot_index(args.next())?)),
        "/generate" => Ok(ReplCommand::Generate),
        // Everything after the command is the instruction, as typed
        "/edit" => Ok(ReplCommand::Edit(rest.to_string())),
        "/undo" => Ok(ReplCommand::Undo),
        "/redo" => Ok(ReplCommand::Redo),
        "/start-over" => Ok(ReplCommand::StartOver),
        "/reuse" => Ok(ReplCommand::Reuse),
        "/download" => Ok(ReplCommand::Download(args.next().map(PathBuf::from))),
        "/status" => Ok(ReplCommand::Status),
        "/dismiss" => Ok(ReplCommand::Dismiss),
        "/help" => Ok(ReplCommand::Help),
        _ => Err(format!("Unknown command: {}", name)),
    }
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct ReplHelper {
    commands: Vec<String>,
}

impl ReplHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|(name, _)| name.to_string()).collect(),
        }
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for ReplHelper {}

fn print_help() {
    for (name, usage) in COMMANDS {
        println!("  {:<12} {}", name.bright_cyan(), usage.bright_black());
    }
    println!("  {}", "quit".bright_cyan());
}

fn print_status(snapshot: &CompositionSnapshot) {
    println!("{}", "Slots:".bright_magenta());
    for slot in &snapshot.slots {
        let content = match &slot.file_name {
            Some(name) => format!("{} ({} bytes)", name, slot.size_bytes).normal(),
            None => "empty".bright_black(),
        };
        println!("  [{}] {:<20} {}", slot.index, slot.label, content);
    }

    let position = match snapshot.cursor {
        Some(cursor) => format!("{} of {}", cursor + 1, snapshot.history_len),
        None => "no result yet".to_string(),
    };
    println!("{} {}", "History:".bright_magenta(), position);

    let state = if snapshot.is_loading {
        "generating...".yellow()
    } else if let Some(error) = &snapshot.error {
        error.red()
    } else {
        "idle".green()
    };
    println!("{} {}", "State:".bright_magenta(), state);

    if snapshot.show_regenerate {
        println!("{}", "Inputs changed since the last result: /generate to regenerate.".yellow());
    }
}

fn print_outcome(outcome: &CompletionOutcome) {
    match outcome {
        CompletionOutcome::Applied { cursor, discarded } => {
            let mut message = format!("Result ready (history position {}).", cursor + 1);
            if *discarded > 0 {
                message.push_str(&format!(" Dropped {} redo step(s).", discarded));
            }
            println!("{}", message.bright_green());
        }
        CompletionOutcome::Failed(message) => println!("{}", message.red()),
        CompletionOutcome::Stale => {
            println!("{}", "A result from an abandoned session was discarded.".bright_black())
        }
    }
}

fn report<T>(result: makeover_core::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            println!("{}", err.to_string().red());
            None
        }
    }
}

/// Prints the outcome once the background request finishes.
fn watch_request(handle: JoinHandle<CompletionOutcome>) {
    tokio::spawn(async move {
        match handle.await {
            Ok(outcome) => print_outcome(&outcome),
            Err(err) => eprintln!("{}", format!("Generation task failed: {}", err).red()),
        }
    });
}

async fn execute(usecase: &MakeoverUseCase, command: ReplCommand) {
    match command {
        ReplCommand::Upload(files) => {
            if let Some(placed) = report(usecase.upload_files(&files).await) {
                println!("{}", format!("{} image(s) placed.", placed).green());
                if files.len() > placed {
                    println!(
                        "{}",
                        format!("{} extra file(s) ignored.", files.len() - placed).yellow()
                    );
                }
            }
        }
        ReplCommand::Set(index, file) => {
            if report(usecase.set_slot_from_file(index, &file).await).is_some() {
                println!("{}", format!("Slot {} updated.", index).green());
            }
        }
        ReplCommand::Clear(index) => {
            if report(usecase.remove_slot(index).await).is_some() {
                println!("{}", format!("Slot {} cleared.", index).green());
            }
        }
        ReplCommand::Generate => {
            if let Some(handle) = report(usecase.start_generate().await) {
                println!("{}", "Generating makeover...".bright_magenta());
                watch_request(handle);
            }
        }
        ReplCommand::Edit(instruction) => {
            if let Some(handle) = report(usecase.start_edit(&instruction).await) {
                println!("{}", "Applying edit...".bright_magenta());
                watch_request(handle);
            }
        }
        ReplCommand::Undo => {
            if !usecase.undo().await {
                println!("{}", "Nothing to undo.".bright_black());
            }
        }
        ReplCommand::Redo => {
            if !usecase.redo().await {
                println!("{}", "Nothing to redo.".bright_black());
            }
        }
        ReplCommand::StartOver => {
            usecase.start_over().await;
            println!("{}", "Started over.".green());
        }
        ReplCommand::Reuse => {
            if report(usecase.reuse_result_as_reference().await).is_some() {
                println!(
                    "{}",
                    "Result placed in the vibe slot. Add new elements and /generate.".green()
                );
            }
        }
        ReplCommand::Download(dir) => {
            if let Some(path) = report(usecase.download(dir.as_deref()).await) {
                println!("{}", format!("Saved {}", path.display()).bright_green());
            }
        }
        ReplCommand::Status => print_status(&usecase.snapshot().await),
        ReplCommand::Dismiss => usecase.dismiss_error().await,
        ReplCommand::Help => print_help(),
        ReplCommand::Quit => {}
    }
}

/// Runs the interactive session until `quit` or end of input.
pub async fn run(base_dir: Option<&Path>) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<GenerationEvent>();
    let app = bootstrap::build(base_dir, Some(event_tx)).await?;

    // Backend warnings are shown inline; everything else stays in the log file
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if event.level == "WARN" || event.level == "ERROR" {
                println!("{}", format!("[{}] {}", event.level, event.message).bright_black());
            }
        }
    });

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ReplHelper::new()));

    println!("{}", "=== Makeover ===".bright_magenta().bold());
    println!("{}", "Type '/help' for commands or 'quit' to exit.".bright_black());
    println!();

    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match parse_command(trimmed) {
                    Ok(ReplCommand::Quit) => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Ok(command) => execute(&app.usecase, command).await,
                    Err(message) => println!("{}", message.yellow()),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slot_commands() {
        assert_eq!(
            parse_command("/upload me.png hat.png").unwrap(),
            ReplCommand::Upload(vec![PathBuf::from("me.png"), PathBuf::from("hat.png")])
        );
        assert_eq!(
            parse_command("/set 6 vibe.jpg").unwrap(),
            ReplCommand::Set(6, PathBuf::from("vibe.jpg"))
        );
        assert_eq!(parse_command("/clear 3").unwrap(), ReplCommand::Clear(3));
        assert!(parse_command("/set x vibe.jpg").is_err());
        assert!(parse_command("/set 2").is_err());
        assert!(parse_command("/upload").is_err());
    }

    #[test]
    fn test_parse_edit_keeps_instruction_text() {
        assert_eq!(
            parse_command("/edit make  the coat   longer").unwrap(),
            ReplCommand::Edit("make  the coat   longer".to_string())
        );
        // Empty instructions are rejected by the engine, not the parser
        assert_eq!(parse_command("/edit").unwrap(), ReplCommand::Edit(String::new()));
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(parse_command("quit").unwrap(), ReplCommand::Quit);
        assert_eq!(parse_command("/start-over").unwrap(), ReplCommand::StartOver);
        assert_eq!(parse_command("/download").unwrap(), ReplCommand::Download(None));
        assert_eq!(
            parse_command("/download out").unwrap(),
            ReplCommand::Download(Some(PathBuf::from("out")))
        );
        assert!(parse_command("/frobnicate").is_err());
    }

    #[test]
    fn test_helper_lists_every_command() {
        let helper = ReplHelper::new();
        assert!(helper.commands.contains(&"/start-over".to_string()));
        assert_eq!(helper.commands.len(), COMMANDS.len());
    }
}
