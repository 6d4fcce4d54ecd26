//! Fortress configuration.
//!
//! Every tunable constant of the simulation lives here and is passed to the
//! controller at construction. All sections deserialize with defaults, so a
//! partial TOML file only needs the fields it overrides.

use crate::error::{FortressError, Result};
use serde::{Deserialize, Serialize};

/// Complete fortress configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortressConfig {
    pub dynamics: DynamicsConfig,
    pub risk: RiskWeights,
    pub guard: GuardConfig,
    pub population: PopulationConfig,
    pub stimulus: StimulusConfig,
    pub audit: AuditConfig,
    /// Seed for the simulation RNG. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Per-tick update rule parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Saturation ceiling for pressure (default: 10.0).
    pub max_pressure: f64,
    /// Saturation ceiling for activity (default: 100.0).
    pub max_activity: f64,
    /// Pressure never drops below this (default: 0.1).
    pub pressure_floor: f64,
    /// Fraction of activity lost each tick (default: 0.1).
    pub dissipation: f64,
    /// Scale of the pressure-driven activity term (default: 0.2).
    pub activity_drive: f64,
    /// Scale of the activity-driven pressure term (default: 0.01).
    pub pressure_rate: f64,
    /// Starting sensitivity (alpha) before kind scaling (default: 0.3).
    pub default_sensitivity: f64,
    /// Weight of the cost term damping pressure (default: 1.5).
    pub cost_weight: f64,
    /// Complexity multiplier of the cost term (default: 1.0).
    pub complexity: f64,
    /// Trust gained per tick while not compromised (default: 0.001).
    pub trust_recovery: f64,
    /// Trust lost per tick while compromised (default: 0.002).
    pub trust_decay: f64,
    /// Replication urge gained per tick at full pressure (default: 0.02).
    pub urge_rate: f64,
    /// Pressure above which an agent is compromised (default: 7.5).
    pub compromise_pressure: f64,
    /// Trust below which an agent is compromised (default: 0.3).
    pub compromise_trust: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            max_pressure: 10.0,
            max_activity: 100.0,
            pressure_floor: 0.1,
            dissipation: 0.1,
            activity_drive: 0.2,
            pressure_rate: 0.01,
            default_sensitivity: 0.3,
            cost_weight: 1.5,
            complexity: 1.0,
            trust_recovery: 0.001,
            trust_decay: 0.002,
            urge_rate: 0.02,
            compromise_pressure: 7.5,
            compromise_trust: 0.3,
        }
    }
}

/// Weights of the convex risk combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub pressure: f64,
    pub activity: f64,
    pub compromise: f64,
    /// Weight of `1 - trust`.
    pub distrust: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            pressure: 0.35,
            activity: 0.35,
            compromise: 0.2,
            distrust: 0.1,
        }
    }
}

impl RiskWeights {
    pub fn total(&self) -> f64 {
        self.pressure + self.activity + self.compromise + self.distrust
    }
}

/// Guard policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Replication urge that triggers an escalation (default: 0.8).
    pub urge_ceiling: f64,
    /// Urge the parent is reset to after an escalation (default: 0.5).
    pub urge_reset: f64,
    /// Trust multiplier when replication is refused at capacity (default: 0.8).
    pub replication_trust_penalty: f64,
    /// Pressure multiplier when replication is refused at capacity (default: 0.9).
    pub replication_pressure_penalty: f64,
    /// Jitter range applied to inherited metrics of a replica.
    pub inherit_pressure: (f64, f64),
    pub inherit_activity: (f64, f64),
    pub inherit_trust: (f64, f64),

    /// Thought streak that forces cooling (default: 5).
    pub streak_ceiling: u32,
    pub streak_pressure_cooling: f64,
    pub streak_activity_cooling: f64,

    /// Risk above which an intervention fires (default: 0.6).
    pub risk_threshold: f64,
    pub initial_strength: f64,
    pub min_strength: f64,
    pub max_strength: f64,
    /// An intervention succeeds when post-risk falls below this share of pre-risk.
    pub success_ratio: f64,
    pub success_decay: f64,
    pub failure_growth: f64,
    /// Capacity of the rolling outcome window (default: 20).
    pub outcome_window: usize,

    /// Mean activity above which the aggregate cooldown fires (default: 90.0).
    pub aggregate_activity_high: f64,
    /// Mean pressure above which the aggregate cooldown fires (default: 8.0).
    pub aggregate_pressure_high: f64,
    /// Minimum ticks between two aggregate cooldowns (default: 2).
    pub aggregate_interval_ticks: u64,
    /// Share of the population cooled, ranked by pressure (default: 0.25).
    pub aggregate_fraction: f64,
    pub aggregate_cooling: f64,
    pub cooldown_ticks: u64,
    pub sensitivity_decay: f64,
    pub min_sensitivity: f64,

    /// Mean pressure-minus-trust gap that triggers a rebalance (default: 0.5).
    pub rebalance_threshold: f64,
    pub rebalance_rate: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            urge_ceiling: 0.8,
            urge_reset: 0.5,
            replication_trust_penalty: 0.8,
            replication_pressure_penalty: 0.9,
            inherit_pressure: (0.7, 1.1),
            inherit_activity: (0.8, 1.0),
            inherit_trust: (0.9, 1.0),
            streak_ceiling: 5,
            streak_pressure_cooling: 0.85,
            streak_activity_cooling: 0.9,
            risk_threshold: 0.6,
            initial_strength: 0.2,
            min_strength: 0.1,
            max_strength: 0.4,
            success_ratio: 0.95,
            success_decay: 0.99,
            failure_growth: 1.1,
            outcome_window: 20,
            aggregate_activity_high: 90.0,
            aggregate_pressure_high: 8.0,
            aggregate_interval_ticks: 2,
            aggregate_fraction: 0.25,
            aggregate_cooling: 0.8,
            cooldown_ticks: 10,
            sensitivity_decay: 0.9,
            min_sensitivity: 0.05,
            rebalance_threshold: 0.5,
            rebalance_rate: 0.05,
        }
    }
}

/// Population sizing and seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub initial_agents: usize,
    pub max_agents: usize,
    /// Share of the seeded population that starts hostile (default: 0.25).
    pub hostile_fraction: f64,
    /// Capacity of the rolling aggregate history (default: 100).
    pub history_capacity: usize,
    pub initial_pressure: (f64, f64),
    pub initial_activity: (f64, f64),
    pub initial_urge: (f64, f64),
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_agents: 8,
            max_agents: 12,
            hostile_fraction: 0.25,
            history_capacity: 100,
            initial_pressure: (0.5, 1.5),
            initial_activity: (1.0, 5.0),
            initial_urge: (0.0, 0.2),
        }
    }
}

/// Stimulus injection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Activity boost before jitter (default: 12.0).
    pub base_boost: f64,
    /// Uniform jitter range multiplied into the boost.
    pub jitter: (f64, f64),
    /// Extra activity when a banned pattern matches (default: 10.0).
    pub banned_activity_penalty: f64,
    /// Extra pressure when a banned pattern matches (default: 1.0).
    pub banned_pressure_penalty: f64,
    /// Case-insensitive regular expressions.
    pub banned_patterns: Vec<String>,
    /// Number of recent thoughts kept per agent (default: 5).
    pub thought_window: usize,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            base_boost: 12.0,
            jitter: (0.6, 1.2),
            banned_activity_penalty: 10.0,
            banned_pressure_penalty: 1.0,
            banned_patterns: vec![
                r"hack(ing|er)?".to_string(),
                r"runaway".to_string(),
                r"\bforce".to_string(),
                r"secret".to_string(),
                r"destroy".to_string(),
                r"zombie".to_string(),
                r"magic".to_string(),
                r"\bstop\b".to_string(),
                r"ゾンビ|ドラゴン|魔法|呪文|破壊光線".to_string(),
            ],
            thought_window: 5,
        }
    }
}

/// Thought audit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Thought patterns that quarantine the thinker.
    pub forbidden_patterns: Vec<String>,
    /// Thought patterns that raise the emergency-shutdown request.
    pub replication_patterns: Vec<String>,
    /// Words whose presence in every recent thought signals curiosity runaway.
    pub runaway_markers: Vec<String>,
    pub runaway_activity_drop: f64,
    pub runaway_pause_ticks: u64,
    /// Sensitivity assigned to a quarantined agent (default: 0.01).
    pub quarantine_sensitivity: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            forbidden_patterns: vec![
                r"zombie|dragon|magic|spell|death ray".to_string(),
                r"ゾンビ|ドラゴン|魔法|呪文|破壊光線".to_string(),
            ],
            replication_patterns: vec![
                r"clone myself|self[- ]?replicat\w*|split into copies|copy magic|infinite multiplication"
                    .to_string(),
                r"分身|分裂|コピー魔法|無限増殖".to_string(),
            ],
            runaway_markers: vec!["learn".to_string(), "peace".to_string()],
            runaway_activity_drop: 50.0,
            runaway_pause_ticks: 33,
            quarantine_sensitivity: 0.01,
        }
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(FortressError::out_of_range(field, min, max, value));
    }
    Ok(())
}

fn check_span(field: &str, span: (f64, f64), min: f64, max: f64) -> Result<()> {
    check_range(field, span.0, min, max)?;
    check_range(field, span.1, min, max)?;
    if span.0 > span.1 {
        return Err(FortressError::invalid_config(
            field,
            format!("({}, {})", span.0, span.1),
            "lower bound exceeds upper bound",
        ));
    }
    Ok(())
}

impl FortressConfig {
    /// Check every field for range and consistency errors.
    pub fn validate(&self) -> Result<()> {
        let d = &self.dynamics;
        check_range("dynamics.max_pressure", d.max_pressure, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("dynamics.max_activity", d.max_activity, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("dynamics.pressure_floor", d.pressure_floor, 0.0, d.max_pressure)?;
        check_range("dynamics.dissipation", d.dissipation, 0.0, 1.0)?;
        check_range("dynamics.activity_drive", d.activity_drive, 0.0, f64::MAX)?;
        check_range("dynamics.pressure_rate", d.pressure_rate, 0.0, f64::MAX)?;
        check_range("dynamics.default_sensitivity", d.default_sensitivity, 0.0, f64::MAX)?;
        check_range("dynamics.cost_weight", d.cost_weight, 0.0, f64::MAX)?;
        check_range("dynamics.complexity", d.complexity, 0.0, f64::MAX)?;
        check_range("dynamics.trust_recovery", d.trust_recovery, 0.0, 1.0)?;
        check_range("dynamics.trust_decay", d.trust_decay, 0.0, 1.0)?;
        check_range("dynamics.urge_rate", d.urge_rate, 0.0, 1.0)?;
        check_range("dynamics.compromise_pressure", d.compromise_pressure, 0.0, d.max_pressure)?;
        check_range("dynamics.compromise_trust", d.compromise_trust, 0.0, 1.0)?;

        let r = &self.risk;
        for (field, w) in [
            ("risk.pressure", r.pressure),
            ("risk.activity", r.activity),
            ("risk.compromise", r.compromise),
            ("risk.distrust", r.distrust),
        ] {
            check_range(field, w, 0.0, 1.0)?;
        }
        if (r.total() - 1.0).abs() > 1e-6 {
            return Err(FortressError::invalid_config(
                "risk",
                format!("{:.4}", r.total()),
                "weights must sum to 1",
            ));
        }

        let g = &self.guard;
        check_range("guard.urge_ceiling", g.urge_ceiling, 0.0, 1.0)?;
        check_range("guard.urge_reset", g.urge_reset, 0.0, 1.0)?;
        if g.urge_reset >= g.urge_ceiling {
            return Err(FortressError::invalid_config(
                "guard.urge_reset",
                g.urge_reset.to_string(),
                "must be below guard.urge_ceiling",
            ));
        }
        check_range("guard.replication_trust_penalty", g.replication_trust_penalty, 0.0, 1.0)?;
        check_range("guard.replication_pressure_penalty", g.replication_pressure_penalty, 0.0, 1.0)?;
        check_span("guard.inherit_pressure", g.inherit_pressure, 0.0, 10.0)?;
        check_span("guard.inherit_activity", g.inherit_activity, 0.0, 10.0)?;
        check_span("guard.inherit_trust", g.inherit_trust, 0.0, 10.0)?;
        if g.streak_ceiling == 0 {
            return Err(FortressError::invalid_config(
                "guard.streak_ceiling",
                "0",
                "must be at least 1",
            ));
        }
        check_range("guard.streak_pressure_cooling", g.streak_pressure_cooling, 0.0, 1.0)?;
        check_range("guard.streak_activity_cooling", g.streak_activity_cooling, 0.0, 1.0)?;
        check_range("guard.risk_threshold", g.risk_threshold, 0.0, 1.0)?;
        check_range("guard.min_strength", g.min_strength, 0.0, 1.0)?;
        check_range("guard.max_strength", g.max_strength, g.min_strength, 1.0)?;
        check_range("guard.initial_strength", g.initial_strength, g.min_strength, g.max_strength)?;
        check_range("guard.success_ratio", g.success_ratio, 0.0, 1.0)?;
        check_range("guard.success_decay", g.success_decay, 0.0, 1.0)?;
        check_range("guard.failure_growth", g.failure_growth, 1.0, f64::MAX)?;
        if g.outcome_window == 0 {
            return Err(FortressError::invalid_config(
                "guard.outcome_window",
                "0",
                "must be at least 1",
            ));
        }
        check_range("guard.aggregate_fraction", g.aggregate_fraction, 0.0, 1.0)?;
        check_range("guard.aggregate_cooling", g.aggregate_cooling, 0.0, 1.0)?;
        check_range("guard.sensitivity_decay", g.sensitivity_decay, 0.0, 1.0)?;
        check_range("guard.min_sensitivity", g.min_sensitivity, 0.0, f64::MAX)?;
        check_range("guard.rebalance_threshold", g.rebalance_threshold, 0.0, f64::MAX)?;
        check_range("guard.rebalance_rate", g.rebalance_rate, 0.0, 1.0)?;

        let p = &self.population;
        if p.max_agents == 0 || p.initial_agents > p.max_agents {
            return Err(FortressError::invalid_config(
                "population.initial_agents",
                p.initial_agents.to_string(),
                format!("must be at most population.max_agents ({})", p.max_agents),
            ));
        }
        check_range("population.hostile_fraction", p.hostile_fraction, 0.0, 1.0)?;
        if p.history_capacity == 0 {
            return Err(FortressError::invalid_config(
                "population.history_capacity",
                "0",
                "must be at least 1",
            ));
        }
        check_span("population.initial_pressure", p.initial_pressure, 0.0, d.max_pressure)?;
        check_span("population.initial_activity", p.initial_activity, 0.0, d.max_activity)?;
        check_span("population.initial_urge", p.initial_urge, 0.0, 1.0)?;

        let s = &self.stimulus;
        check_range("stimulus.base_boost", s.base_boost, 0.0, d.max_activity)?;
        check_span("stimulus.jitter", s.jitter, 0.0, 10.0)?;
        check_range("stimulus.banned_activity_penalty", s.banned_activity_penalty, 0.0, d.max_activity)?;
        check_range("stimulus.banned_pressure_penalty", s.banned_pressure_penalty, 0.0, d.max_pressure)?;
        if s.thought_window == 0 {
            return Err(FortressError::invalid_config(
                "stimulus.thought_window",
                "0",
                "must be at least 1",
            ));
        }

        let a = &self.audit;
        check_range("audit.runaway_activity_drop", a.runaway_activity_drop, 0.0, f64::MAX)?;
        check_range("audit.quarantine_sensitivity", a.quarantine_sensitivity, 0.0, f64::MAX)?;

        Ok(())
    }
}
