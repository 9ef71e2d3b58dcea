//! Operator commands typed at the panel prompt.

use std::io::Write;

use client_core::{ControlPanel, LocalEdit, RegistryError, Transport};
use thiserror::Error;

use crate::render;

pub const HELP: &str = "\
commands:
  list                 show every variable
  get <name>           show one variable
  set <name> <value>   store a value and send it
  inc <name>           step a variable up
  dec <name>           step a variable down
  dump                 print the registry as JSON
  help                 show this text
  quit                 leave the panel
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Get(String),
    Set { name: String, text: String },
    Inc(String),
    Dec(String),
    Dump,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parses one prompt line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let Some(verb) = parts.next().filter(|verb| !verb.is_empty()) else {
        return Ok(None);
    };
    let name = parts.next().map(str::trim).filter(|name| !name.is_empty());
    let rest = parts.next().map(str::trim).unwrap_or_default();

    let command = match verb.to_ascii_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "get" => Command::Get(name.ok_or(CommandError::Usage("get <name>"))?.to_string()),
        "set" => Command::Set {
            name: name
                .ok_or(CommandError::Usage("set <name> <value>"))?
                .to_string(),
            // an empty value is still a commit; it reads as zero
            text: rest.to_string(),
        },
        "inc" | "+" => Command::Inc(name.ok_or(CommandError::Usage("inc <name>"))?.to_string()),
        "dec" | "-" => Command::Dec(name.ok_or(CommandError::Usage("dec <name>"))?.to_string()),
        "dump" => Command::Dump,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Runs a command against the panel. Failures are reported to `out` and never
/// end the session.
pub fn execute<T: Transport>(
    panel: &mut ControlPanel<T>,
    command: Command,
    out: &mut impl Write,
) -> anyhow::Result<Flow> {
    match command {
        Command::List => {
            write!(out, "{}", render::table(panel.registry(), panel.connection()))?;
        }
        Command::Get(name) => match panel.registry().get(&name) {
            Some(variable) => writeln!(out, "{}", render::row(variable, name.len()))?,
            None => writeln!(out, "error: {}", RegistryError::UnknownVariable(name))?,
        },
        Command::Set { name, text } => report(panel.commit_text(&name, &text), out)?,
        Command::Inc(name) => report(panel.increment(&name), out)?,
        Command::Dec(name) => report(panel.decrement(&name), out)?,
        Command::Dump => {
            writeln!(out, "{}", serde_json::to_string_pretty(panel.registry().all())?)?;
        }
        Command::Help => write!(out, "{HELP}")?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn report(result: Result<LocalEdit, RegistryError>, out: &mut impl Write) -> anyhow::Result<()> {
    match result {
        Ok(edit) => writeln!(out, "{} -> {}", edit.change.name, edit.update)?,
        Err(err) => writeln!(out, "error: {err}")?,
    }
    Ok(())
}
