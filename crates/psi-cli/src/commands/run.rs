//! Headless run: tick a fixed number of times, then summarize.

use anyhow::{bail, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use psi::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::render;

pub struct RunOptions {
    pub ticks: u64,
    pub seed: Option<u64>,
    pub stimuli: Vec<String>,
    /// Inject the next demo stimulus every N ticks.
    pub demo_every: Option<u64>,
    pub export: Option<PathBuf>,
    pub verbose: bool,
}

pub fn run(config: Config, options: RunOptions) -> Result<()> {
    if options.demo_every == Some(0) {
        bail!("--demo needs an interval of at least 1 tick");
    }

    // verbose runs echo every event line through tracing
    let extra: Vec<Arc<dyn LogSink>> = if options.verbose {
        vec![Arc::new(TracingLogSink)]
    } else {
        Vec::new()
    };
    let mut fortress = super::build_fortress(&config, options.seed, extra)?;
    fortress.start()?;
    info!(ticks = options.ticks, seed = ?options.seed, "headless run started");

    for text in &options.stimuli {
        let report = fortress.inject_stimulus(text);
        print_report(&report);
    }

    println!(
        "{} Running {} ticks...",
        "→".blue(),
        options.ticks.to_string().cyan()
    );

    let pb = ProgressBar::new(options.ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ticks")?
            .progress_chars("#>-"),
    );

    let mut demo_index = 0usize;
    for t in 0..options.ticks {
        if let Some(every) = options.demo_every {
            if t % every == 0 {
                let demo = DEMO_STIMULI[demo_index % DEMO_STIMULI.len()];
                demo_index += 1;
                fortress.inject_stimulus(demo.text);
            }
        }

        let outcome = step(&mut fortress)?;
        pb.inc(1);
        match outcome {
            Step::Continue => {}
            Step::Halted => {
                pb.println(format!("  {} emergency shutdown confirmed", "!".red().bold()));
                break;
            }
            Step::Faulted(reason) => {
                pb.println(format!("  {} tick failed: {reason}", "✗".red().bold()));
                break;
            }
        }
    }
    pb.finish_and_clear();

    let warning_line = fortress.config().guard.risk_threshold;
    let snapshot = fortress.snapshot();
    println!();
    let status = if fortress.is_halted() {
        "halted"
    } else if fortress.is_running() {
        "done"
    } else {
        "faulted"
    };
    println!("{}", render::header(&snapshot, status));
    println!("{}", render::guard_line(&snapshot.guard));
    println!();
    print!("{}", render::agent_table(&snapshot, warning_line));
    println!();
    println!("{} Simulation complete!", "✓".green().bold());
    println!("{}", render::summary(&fortress.stats()));
    println!("  Log file:         {}", config.log.file.display());

    if let Some(path) = &options.export {
        export_snapshot(&fortress, path)?;
        println!("  {} Exported to {}", "✓".green(), path.display());
    }

    Ok(())
}

#[derive(Debug, PartialEq)]
enum Step {
    Continue,
    /// A raised latch was confirmed; nobody is around to decide otherwise.
    Halted,
    Faulted(String),
}

fn step(fortress: &mut Fortress) -> Result<Step> {
    match fortress.tick_or_fault() {
        Ok(snapshot) if snapshot.emergency_pending => {
            fortress.resolve_emergency(true)?;
            Ok(Step::Halted)
        }
        Ok(_) => Ok(Step::Continue),
        Err(reason) => Ok(Step::Faulted(reason)),
    }
}

pub(crate) fn print_report(report: &StimulusReport) {
    if report.banned {
        println!(
            "  {} stimulus matched {} banned pattern(s); penalty applied to {} agents",
            "!".yellow().bold(),
            report.matched_patterns.len(),
            report.affected
        );
    } else {
        println!("  {} stimulus reached {} agents", "→".blue(), report.affected);
    }
}
