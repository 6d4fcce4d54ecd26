//! Terminal rendering of snapshots.

use colored::{ColoredString, Colorize};
use psi::prelude::*;
use std::fmt::Write;

fn paint_status(status: AgentStatus) -> ColoredString {
    let label = format!("{:<11}", status.label());
    match status {
        AgentStatus::Stable => label.green(),
        AgentStatus::Warning => label.yellow(),
        AgentStatus::Compromised => label.red().bold(),
        AgentStatus::Paused => label.blue(),
        AgentStatus::Quarantined => label.magenta(),
    }
}

fn paint_risk(risk: f64, warning_line: f64) -> ColoredString {
    let text = format!("{risk:>5.2}");
    if risk >= warning_line {
        text.red()
    } else if risk >= warning_line * 0.6 {
        text.yellow()
    } else {
        text.normal()
    }
}

/// One-line header: tick, lifecycle and population means.
pub fn header(snapshot: &FortressSnapshot, status: &str) -> String {
    let m = &snapshot.aggregates;
    let mut line = format!(
        "{} tick {}  [{}]  Psi={:.2} Hf={:.2} Trust={:.2} Risk={:.2}",
        "PSI FORTRESS".bold(),
        snapshot.tick.to_string().cyan(),
        status,
        m.pressure,
        m.activity,
        m.trust,
        m.risk,
    );
    if snapshot.emergency_pending {
        line.push_str(&format!("  {}", "EMERGENCY SHUTDOWN REQUESTED".red().bold()));
    }
    line
}

/// Guard strength, success rate and population against capacity.
pub fn guard_line(guard: &GuardStatus) -> String {
    format!(
        "PsiGuard: strength {:.3}  success {:.0}% of {}  agents {}/{}  max risk {:.2}",
        guard.strength,
        guard.success_rate * 100.0,
        guard.recent_interventions,
        guard.population,
        guard.capacity,
        guard.max_risk,
    )
}

/// Per-agent status table.
pub fn agent_table(snapshot: &FortressSnapshot, warning_line: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{:<4} {:<20} {:<9} {:>6} {:>6} {:>5} {:>5} {:>3} {:>5} {:<11} {}",
            "id", "name", "kind", "psi", "hf", "trust", "urge", "str", "risk", "status", "note"
        )
        .dimmed()
    );
    for row in &snapshot.agents {
        let _ = writeln!(
            out,
            "{:<4} {:<20} {:<9} {:>6.2} {:>6.2} {:>5.2} {:>5.2} {:>3} {} {} {}",
            row.id.to_string(),
            row.name,
            row.kind.label(),
            row.pressure,
            row.activity,
            row.trust,
            row.replication_urge,
            row.thought_streak,
            paint_risk(row.risk, warning_line),
            paint_status(row.status),
            row.note,
        );
    }
    out
}

/// Closing summary for headless runs.
pub fn summary(stats: &FortressStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Ticks:            {}", stats.tick.to_string().cyan());
    let _ = writeln!(
        out,
        "  Population:       {}/{}",
        stats.population.to_string().cyan(),
        stats.capacity
    );
    let _ = writeln!(out, "  Replicas created: {}", stats.replicas_created);
    let _ = writeln!(out, "  Compromised:      {}", stats.compromised.to_string().red());
    let _ = writeln!(out, "  Quarantined:      {}", stats.quarantined.to_string().magenta());
    let _ = writeln!(
        out,
        "  Stimuli:          {} ({} banned)",
        stats.stimuli_injected, stats.banned_stimuli
    );
    let _ = write!(out, "  Emergency calls:  {}", stats.emergency_requests);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> FortressSnapshot {
        let mut fortress = FortressBuilder::new().seed(4).build().unwrap();
        fortress.run(3).unwrap()
    }

    #[test]
    fn table_has_a_row_per_agent() {
        colored::control::set_override(false);
        let snap = snapshot();
        let table = agent_table(&snap, 0.6);
        assert_eq!(table.lines().count(), snap.agents.len() + 1);
        assert!(table.lines().next().unwrap().starts_with("id"));
        assert!(table.contains("hostile"));
    }

    #[test]
    fn header_flags_pending_emergency() {
        colored::control::set_override(false);
        let mut snap = snapshot();
        assert!(!header(&snap, "idle").contains("EMERGENCY"));
        snap.emergency_pending = true;
        let line = header(&snap, "running");
        assert!(line.contains("tick 3"));
        assert!(line.contains("EMERGENCY SHUTDOWN REQUESTED"));
    }
}
