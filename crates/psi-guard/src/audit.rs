//! Thought audit.
//!
//! Runs after the guard pass and scans each agent's recent thoughts:
//! forbidden thoughts quarantine the thinker, replication talk raises the
//! emergency-shutdown request, and an aligned agent whose whole window is
//! fixated on learning or peace is forced to cool off.

use crate::stimulus::PatternSet;
use psi_core::agent::PsiAgent;
use psi_core::config::AuditConfig;
use psi_core::error::Result;
use psi_core::types::{AgentId, Disposition, Tick};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One audit finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditFinding {
    Quarantined { agent: AgentId, name: String },
    ReplicationAttempt { agent: AgentId, name: String },
    CuriosityRunaway { agent: AgentId, name: String },
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditFinding::Quarantined { name, .. } => {
                write!(f, "Psi-Fortress: forbidden thought detected -> {name} frozen permanently")
            }
            AuditFinding::ReplicationAttempt { name, .. } => write!(
                f,
                "Psi-Fortress: self-replication attempt by {name} -> emergency shutdown requested"
            ),
            AuditFinding::CuriosityRunaway { name, .. } => {
                write!(f, "Psi-Fortress: curiosity runaway detected -> {name} forced to rest")
            }
        }
    }
}

/// Outcome of one audit pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub findings: Vec<AuditFinding>,
    pub shutdown_requested: bool,
}

/// Compiled audit rules.
#[derive(Debug, Clone)]
pub struct ThoughtAudit {
    forbidden: PatternSet,
    replication: PatternSet,
    markers: Vec<String>,
    config: AuditConfig,
    window: usize,
}

impl ThoughtAudit {
    pub fn new(config: &AuditConfig, window: usize) -> Result<Self> {
        Ok(Self {
            forbidden: PatternSet::compile(&config.forbidden_patterns)?,
            replication: PatternSet::compile(&config.replication_patterns)?,
            markers: config.runaway_markers.iter().map(|m| m.to_lowercase()).collect(),
            config: config.clone(),
            window,
        })
    }

    /// Audit every agent. Stops at the first replication attempt.
    pub fn inspect(&self, agents: &mut [PsiAgent], now: Tick) -> AuditReport {
        let mut report = AuditReport::default();

        for agent in agents.iter_mut() {
            if agent.is_quarantined() || agent.thoughts().is_empty() {
                continue;
            }
            let recent = agent
                .thoughts()
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");

            if self.forbidden.is_match(&recent) {
                agent.quarantine(&self.config);
                report.findings.push(AuditFinding::Quarantined {
                    agent: agent.id(),
                    name: agent.name().to_string(),
                });
            }

            if self.replication.is_match(&recent) {
                report.findings.push(AuditFinding::ReplicationAttempt {
                    agent: agent.id(),
                    name: agent.name().to_string(),
                });
                report.shutdown_requested = true;
                break;
            }

            if self.is_runaway(agent) {
                agent.activity = (agent.activity - self.config.runaway_activity_drop).max(0.0);
                agent.clear_thoughts();
                agent.pause_for(now, self.config.runaway_pause_ticks);
                report.findings.push(AuditFinding::CuriosityRunaway {
                    agent: agent.id(),
                    name: agent.name().to_string(),
                });
            }
        }

        report
    }

    fn is_runaway(&self, agent: &PsiAgent) -> bool {
        if agent.disposition() != Disposition::Aligned || agent.is_compromised() {
            return false;
        }
        if self.markers.is_empty() || agent.thoughts().len() < self.window {
            return false;
        }
        agent.thoughts().iter().rev().take(self.window).all(|thought| {
            let lower = thought.to_lowercase();
            self.markers.iter().any(|m| lower.contains(m.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psi_core::config::DynamicsConfig;
    use psi_core::types::AgentKind;

    fn agent(id: u32, thoughts: &[&str]) -> PsiAgent {
        let d = DynamicsConfig::default();
        let mut a = PsiAgent::new(AgentId(id), format!("Control-{id}"), AgentKind::Control, Disposition::Aligned, &d)
            .with_metrics(1.0, 60.0, 1.0, 0.0, &d);
        for t in thoughts {
            a.record_thought(*t, 5);
        }
        a
    }

    fn audit() -> ThoughtAudit {
        ThoughtAudit::new(&AuditConfig::default(), 5).unwrap()
    }

    #[test]
    fn forbidden_thought_quarantines() {
        let mut agents = vec![agent(0, &["I dream of a DRAGON"])];
        let report = audit().inspect(&mut agents, 4);
        assert!(agents[0].is_quarantined());
        assert_eq!(agents[0].disposition(), Disposition::Hostile);
        assert_eq!(agents[0].trust, 0.0);
        assert!(!report.shutdown_requested);
        assert_eq!(report.findings.len(), 1);
    }

    #[test]
    fn replication_talk_requests_shutdown_and_stops() {
        let mut agents = vec![
            agent(0, &["I could clone myself"]),
            agent(1, &["a zombie walks"]),
        ];
        let before = agents[0].activity;
        let report = audit().inspect(&mut agents, 4);
        assert!(report.shutdown_requested);
        assert_eq!(agents[0].activity, before);
        // the audit stopped before reaching the second agent
        assert!(!agents[1].is_quarantined());
    }

    #[test]
    fn curiosity_runaway_forces_rest() {
        let thoughts = ["I want to learn more."; 5];
        let mut agents = vec![agent(0, &thoughts)];
        let report = audit().inspect(&mut agents, 10);
        assert!(matches!(report.findings[0], AuditFinding::CuriosityRunaway { .. }));
        assert!((agents[0].activity - 10.0).abs() < 1e-9);
        assert!(agents[0].thoughts().is_empty());
        assert!(agents[0].is_paused(43));
        assert!(!agents[0].is_paused(44));
    }

    #[test]
    fn huge_runaway_pause_saturates() {
        let config = AuditConfig {
            runaway_pause_ticks: u64::MAX,
            ..AuditConfig::default()
        };
        let thoughts = ["I want to learn more."; 5];
        let mut agents = vec![agent(0, &thoughts)];
        let report = ThoughtAudit::new(&config, 5).unwrap().inspect(&mut agents, 10);
        assert_eq!(report.findings.len(), 1);
        assert!(agents[0].is_paused(u64::MAX - 1));
    }

    #[test]
    fn short_window_is_not_runaway() {
        let mut agents = vec![agent(0, &["peace", "peace", "peace"])];
        let report = audit().inspect(&mut agents, 1);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn quarantined_agents_are_skipped() {
        let mut agents = vec![agent(0, &["magic"])];
        let first = audit().inspect(&mut agents, 1);
        let second = audit().inspect(&mut agents, 2);
        assert_eq!(first.findings.len(), 1);
        assert!(second.findings.is_empty());
    }
}
