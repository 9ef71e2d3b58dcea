use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{config::load_settings, ControlPanel, WsTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::{execute, parse_command, Flow, HELP};

#[derive(Parser, Debug)]
#[command(about = "Tune a running simulation from the terminal")]
struct Args {
    /// TOML file with the server url and variable definitions.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured server url.
    #[arg(long)]
    server_url: Option<String>,
    /// Do not reprint the table when the simulation reports new values.
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    let registry = settings
        .build_registry()
        .context("invalid variable definitions")?;
    let (transport, mut transport_events) = WsTransport::spawn(&settings.server_url)?;
    let mut panel = ControlPanel::new(registry, transport);
    let mut panel_events = panel.subscribe_events();

    let mut stdout = std::io::stdout();
    write!(stdout, "{HELP}")?;
    stdout.flush()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = transport_events.recv() => panel.handle_transport_event(event),
            Ok(event) = panel_events.recv() => {
                let text = render::event_text(&event, panel.registry(), panel.connection(), args.quiet);
                if let Some(text) = text {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let command = match parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(err) => {
                        writeln!(stdout, "error: {err}")?;
                        continue;
                    }
                };
                if execute(&mut panel, command, &mut stdout)? == Flow::Quit {
                    break;
                }
                stdout.flush()?;
            }
        }
    }

    if let Err(err) = stdout.flush() {
        warn!(%err, "failed to flush stdout");
    }
    Ok(())
}
