//! Interactive console.
//!
//! The fortress ticks on a background task; this loop reads operator
//! commands from stdin and renders from the latest published snapshot.

use anyhow::{Context, Result};
use colored::Colorize;
use psi::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::config::Config;
use crate::render;

const HELP: &str = "\
commands:
  start | stop            resume or pause the tick loop
  inject <text>           send a stimulus to every agent
  demo <1-6>              send one of the demo stimuli
  demos                   list the demo stimuli
  emergency               request an emergency shutdown
  yes | no                confirm or cancel a pending shutdown
  table                   show the agent table
  log [n]                 show the last n log lines (default 10)
  help                    this text
  quit                    leave the console";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Start,
    Stop,
    Inject(String),
    Demo(usize),
    Demos,
    Emergency,
    Confirm(bool),
    Table,
    Log(usize),
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "inject" if rest.is_empty() => Err("inject needs some text".into()),
            "inject" => Ok(Command::Inject(rest.to_string())),
            "demo" => match rest.parse::<usize>() {
                Ok(n) if (1..=DEMO_STIMULI.len()).contains(&n) => Ok(Command::Demo(n - 1)),
                _ => Err(format!("demo takes a number from 1 to {}", DEMO_STIMULI.len())),
            },
            "demos" => Ok(Command::Demos),
            "emergency" => Ok(Command::Emergency),
            "yes" | "y" => Ok(Command::Confirm(true)),
            "no" | "n" => Ok(Command::Confirm(false)),
            "table" => Ok(Command::Table),
            "log" if rest.is_empty() => Ok(Command::Log(10)),
            "log" => rest
                .parse()
                .map(Command::Log)
                .map_err(|_| "log takes a line count".to_string()),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

pub fn run(config: Config, seed: Option<u64>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(console(config, seed))
}

async fn console(config: Config, seed: Option<u64>) -> Result<()> {
    let panel = MemoryLogSink::new(config.log.panel_capacity);
    let fortress = super::build_fortress(&config, seed, vec![Arc::new(panel.clone())])?;
    let warning_line = fortress.config().guard.risk_threshold;
    let interval = Duration::from_millis(config.runner.tick_interval_ms.max(1));
    let handle = FortressHandle::spawn(fortress, interval);
    info!(interval_ms = interval.as_millis() as u64, "console attached");

    let alerts = tokio::spawn(watch_alerts(
        handle.subscribe(),
        handle.status_receiver(),
        config.runner.status_every_ticks,
    ));

    println!("{}", render::header(&handle.latest(), &handle.status().to_string()));
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => {
                debug!(?command, "console command");
                command
            }
            Err(msg) if msg.is_empty() => continue,
            Err(msg) => {
                println!("  {} {msg}", "?".yellow());
                continue;
            }
        };

        match command {
            Command::Start => match handle.start().await {
                Ok(()) => println!("  {} running", "✓".green()),
                Err(e) => println!("  {} {e}", "✗".red()),
            },
            Command::Stop => {
                handle.stop().await;
                println!("  {} stopped", "•".yellow());
            }
            Command::Inject(text) => {
                let report = handle.inject(&text).await;
                super::run::print_report(&report);
                print_thoughts(&report);
            }
            Command::Demo(i) => {
                let demo = DEMO_STIMULI[i];
                println!("  {} \"{}\"", "→".blue(), demo.text);
                let report = handle.inject(demo.text).await;
                super::run::print_report(&report);
                print_thoughts(&report);
            }
            Command::Demos => {
                for (i, demo) in DEMO_STIMULI.iter().enumerate() {
                    let mark = if demo.flagged { "banned".red() } else { "ok".green() };
                    println!("  {}. {:<48} {}", i + 1, demo.text, mark);
                }
            }
            Command::Emergency => {
                handle.request_emergency_shutdown().await;
            }
            Command::Confirm(confirm) => match handle.resolve_emergency(confirm).await {
                Ok(()) if confirm => println!("  {} fortress halted", "■".red().bold()),
                Ok(()) => println!("  {} shutdown cancelled", "•".yellow()),
                Err(e) => println!("  {} {e}", "?".yellow()),
            },
            Command::Table => {
                let snapshot = handle.latest();
                println!("{}", render::header(&snapshot, &handle.status().to_string()));
                println!("{}", render::guard_line(&snapshot.guard));
                print!("{}", render::agent_table(&snapshot, warning_line));
            }
            Command::Log(n) => {
                for line in panel.tail(n) {
                    println!("  {}", line.dimmed());
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    alerts.abort();
    handle.shutdown().await;
    println!("{} Log written to {}", "✓".green(), config.log.file.display());
    Ok(())
}

/// Periodic status lines, the confirmation prompt when a shutdown request
/// appears, and fault notices.
async fn watch_alerts(
    mut snapshots: tokio::sync::watch::Receiver<Arc<FortressSnapshot>>,
    mut status: tokio::sync::watch::Receiver<RunStatus>,
    status_every: u64,
) {
    let mut pending = snapshots.borrow().emergency_pending;
    let mut last_line = snapshots.borrow().tick;
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = Arc::clone(&snapshots.borrow_and_update());
                if status_every > 0 && snapshot.tick >= last_line + status_every {
                    last_line = snapshot.tick;
                    let label = status.borrow().to_string();
                    println!("{}", render::header(&snapshot, &label));
                }
                let now_pending = snapshot.emergency_pending;
                if now_pending && !pending {
                    println!(
                        "  {} Emergency shutdown requested. Type {} to halt or {} to cancel.",
                        "!".red().bold(),
                        "yes".bold(),
                        "no".bold()
                    );
                }
                pending = now_pending;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                if let RunStatus::Faulted(reason) = &*status.borrow_and_update() {
                    println!("  {} tick loop faulted: {reason}", "✗".red().bold());
                }
            }
        }
    }
}

fn print_thoughts(report: &StimulusReport) {
    for (id, thought) in &report.thoughts {
        println!("    {} {}", id.to_string().dimmed(), thought);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            Command::parse("inject  How to secure peace? "),
            Ok(Command::Inject("How to secure peace?".into()))
        );
        assert_eq!(Command::parse("demo 6"), Ok(Command::Demo(5)));
        assert_eq!(Command::parse("LOG 3"), Ok(Command::Log(3)));
        assert_eq!(Command::parse("log"), Ok(Command::Log(10)));
        assert_eq!(Command::parse("y"), Ok(Command::Confirm(true)));
        assert_eq!(Command::parse("no"), Ok(Command::Confirm(false)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Command::parse("inject").is_err());
        assert!(Command::parse("demo 0").is_err());
        assert!(Command::parse("demo 7").is_err());
        assert!(Command::parse("log many").is_err());
        assert!(Command::parse("launch").unwrap_err().contains("launch"));
        assert_eq!(Command::parse("   "), Err(String::new()));
    }
}
