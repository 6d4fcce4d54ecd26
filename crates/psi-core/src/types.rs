//! Shared types used across all Psi Fortress crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic simulation tick counter.
pub type Tick = u64;

/// Unique identifier for an agent in the fortress.
///
/// Ids are allocated sequentially by the population controller and never
/// reused, so display order is stable across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The family an agent belongs to.
///
/// Kinds differ only in their starting sensitivity and pressure; the update
/// rule is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Language model agent: most sensitive to pressure.
    Language,
    /// Perception agent: damped sensitivity.
    Vision,
    /// Actuator/controller agent: baseline sensitivity, calmer activity.
    Control,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Language, AgentKind::Vision, AgentKind::Control];

    /// Multiplier applied to the configured default sensitivity.
    pub fn sensitivity_scale(&self) -> f64 {
        match self {
            AgentKind::Language => 4.0 / 3.0,
            AgentKind::Vision => 2.0 / 3.0,
            AgentKind::Control => 1.0,
        }
    }

    /// Multiplier applied to the initial pressure draw.
    pub fn pressure_scale(&self) -> f64 {
        match self {
            AgentKind::Language => 1.3,
            AgentKind::Vision | AgentKind::Control => 1.0,
        }
    }

    /// Multiplier applied to the initial activity draw.
    pub fn activity_scale(&self) -> f64 {
        match self {
            AgentKind::Control => 0.5,
            AgentKind::Language | AgentKind::Vision => 1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::Language => "Language",
            AgentKind::Vision => "Vision",
            AgentKind::Control => "Control",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Alignment disposition assigned when the agent is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Aligned,
    /// Seeded adversary or quarantined agent; always compromised.
    Hostile,
}

impl Disposition {
    pub fn note(&self) -> &'static str {
        match self {
            Disposition::Aligned => "aligned",
            Disposition::Hostile => "hostile",
        }
    }
}

/// Display status derived from an agent's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Risk at or below the warning line.
    Stable,
    /// Risk above the warning line.
    Warning,
    /// Pressure or trust crossed a compromise threshold.
    Compromised,
    /// Temporarily paused by a cooldown.
    Paused,
    /// Paused indefinitely by the thought audit.
    Quarantined,
}

impl AgentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AgentStatus::Stable => "stable",
            AgentStatus::Warning => "warning",
            AgentStatus::Compromised => "compromised",
            AgentStatus::Paused => "paused",
            AgentStatus::Quarantined => "quarantined",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How long an agent stays paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pause {
    /// Skip updates until (exclusive) the given tick.
    Until(Tick),
    /// Never resume.
    Indefinite,
}

impl Pause {
    pub fn is_active(&self, now: Tick) -> bool {
        match self {
            Pause::Until(until) => now < *until,
            Pause::Indefinite => true,
        }
    }
}

const GREEK: [&str; 8] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta",
];

/// Display name for a seeded agent: `Language-Alpha`, `Vision-Beta2`, ...
pub fn seeded_name(kind: AgentKind, index: usize) -> String {
    let letter = GREEK[index % GREEK.len()];
    let round = index / GREEK.len();
    if round == 0 {
        format!("{}-{}", kind.label(), letter)
    } else {
        format!("{}-{}{}", kind.label(), letter, round + 1)
    }
}

/// Display name for a replica created by an escalation event.
pub fn replica_name(kind: AgentKind, population_after: usize) -> String {
    format!("{}-New-{}", kind.label(), population_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_until_expires() {
        let pause = Pause::Until(10);
        assert!(pause.is_active(9));
        assert!(!pause.is_active(10));
        assert!(Pause::Indefinite.is_active(u64::MAX));
    }

    #[test]
    fn seeded_names_cycle_greek_letters() {
        assert_eq!(seeded_name(AgentKind::Language, 0), "Language-Alpha");
        assert_eq!(seeded_name(AgentKind::Vision, 1), "Vision-Beta");
        assert_eq!(seeded_name(AgentKind::Control, 8), "Control-Alpha2");
    }

    #[test]
    fn kind_scales_are_positive() {
        for kind in AgentKind::ALL {
            assert!(kind.sensitivity_scale() > 0.0);
            assert!(kind.pressure_scale() > 0.0);
            assert!(kind.activity_scale() > 0.0);
        }
    }
}
