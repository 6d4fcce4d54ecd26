//! Immutable views of the fortress handed to readers after each tick.

use psi_core::agent::PsiAgent;
use psi_core::types::{AgentId, AgentKind, AgentStatus, Tick};
use psi_guard::guard::PopulationMeans;
use serde::{Deserialize, Serialize};

/// One row of the agent table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRow {
    pub id: AgentId,
    pub name: String,
    pub kind: AgentKind,
    pub pressure: f64,
    pub activity: f64,
    pub trust: f64,
    pub replication_urge: f64,
    pub thought_streak: u32,
    pub sensitivity: f64,
    pub risk: f64,
    pub compromised: bool,
    pub status: AgentStatus,
    /// Disposition note ("aligned" or "hostile").
    pub note: String,
    pub latest_thought: Option<String>,
}

impl AgentRow {
    pub fn from_agent(agent: &PsiAgent, now: Tick, warning_line: f64) -> Self {
        Self {
            id: agent.id(),
            name: agent.name().to_string(),
            kind: agent.kind(),
            pressure: agent.pressure,
            activity: agent.activity,
            trust: agent.trust,
            replication_urge: agent.replication_urge,
            thought_streak: agent.thought_streak,
            sensitivity: agent.sensitivity,
            risk: agent.risk(),
            compromised: agent.is_compromised(),
            status: agent.status(now, warning_line),
            note: agent.disposition().note().to_string(),
            latest_thought: agent.latest_thought().map(str::to_string),
        }
    }
}

/// Guard policy state as seen by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuardStatus {
    pub strength: f64,
    pub success_rate: f64,
    /// Interventions currently in the outcome window.
    pub recent_interventions: usize,
    pub population: usize,
    pub capacity: usize,
    pub max_risk: f64,
}

/// Aggregate metrics recorded once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub tick: Tick,
    pub aggregates: PopulationMeans,
}

/// Everything a reader needs to render the fortress at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortressSnapshot {
    pub tick: Tick,
    pub running: bool,
    pub halted: bool,
    pub emergency_pending: bool,
    pub aggregates: PopulationMeans,
    pub guard: GuardStatus,
    pub agents: Vec<AgentRow>,
}

impl FortressSnapshot {
    pub fn agent(&self, id: AgentId) -> Option<&AgentRow> {
        self.agents.iter().find(|row| row.id == id)
    }

    pub fn count_with_status(&self, status: AgentStatus) -> usize {
        self.agents.iter().filter(|row| row.status == status).count()
    }
}

/// Running totals since the fortress was created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FortressStats {
    pub tick: Tick,
    pub population: usize,
    pub capacity: usize,
    pub replicas_created: usize,
    pub compromised: usize,
    pub quarantined: usize,
    pub stimuli_injected: usize,
    pub banned_stimuli: usize,
    pub emergency_requests: usize,
}
