//! Prompt command parser.
//!
//! Handles user commands like `connect`, `join`, `submit`, etc.

use std::path::PathBuf;

/// A parsed prompt command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect(String),
    Join,
    Submit { language: String, path: PathBuf },
    Finish,
    Status,
    Disconnect,
    Help,
    Quit,
}

/// Text shown by `help`.
pub const HELP: &str = "\
Commands:
  connect <name>             open a session as <name>
  join                       enter the matchmaking queue
  submit <language> <file>   run <file> against the current problem
                             (python, javascript, cpp, java)
  finish                     declare your side of the duel finished
  status                     show the session state
  disconnect                 close the session
  help                       show this text
  quit                       leave";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(input: &str) -> Result<Option<Command>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = input.split_whitespace().collect();
    let command = parts[0].to_lowercase();
    let args = &parts[1..];

    let parsed = match command.as_str() {
        "connect" => match args {
            [name] => Command::Connect(name.to_string()),
            _ => return Err("Usage: connect <name>".to_string()),
        },
        "join" => Command::Join,
        "submit" | "run" => match args {
            [language, path] => Command::Submit {
                language: language.to_string(),
                path: PathBuf::from(path),
            },
            _ => return Err("Usage: submit <language> <file>".to_string()),
        },
        "finish" => Command::Finish,
        "status" => Command::Status,
        "disconnect" => Command::Disconnect,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => {
            return Err(format!(
                "Unknown command: {}. Type 'help' for available commands.",
                command
            ));
        }
    };

    Ok(Some(parsed))
}
