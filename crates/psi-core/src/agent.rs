//! Agent state and the per-tick update rule.
//!
//! A `PsiAgent` carries a handful of bounded scalars. Each tick the agent
//! advances its own activity and pressure through saturating updates, drifts
//! its trust, grows its replication urge and then refreshes its derived
//! state (compromise flag and risk score). The guard policy mutates the same
//! fields afterwards through the narrow helpers below.

use crate::config::{AuditConfig, DynamicsConfig, RiskWeights};
use crate::error::{FortressError, Result};
use crate::risk::{risk_score, RiskInputs};
use crate::types::{AgentId, AgentKind, AgentStatus, Disposition, Pause, Tick};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A simulated agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiAgent {
    id: AgentId,
    name: String,
    kind: AgentKind,
    disposition: Disposition,

    /// Intelligence pressure, in `[0, max_pressure]`.
    pub pressure: f64,
    /// Activity level, in `[0, max_activity]`.
    pub activity: f64,
    /// Trust, in `[0, 1]`.
    pub trust: f64,
    /// Replication urge, in `[0, 1]`.
    pub replication_urge: f64,
    /// Active ticks since the last streak cooling.
    pub thought_streak: u32,
    /// Alpha: how strongly pressure drives activity.
    pub sensitivity: f64,

    risk: f64,
    compromised: bool,
    pause: Option<Pause>,
    thoughts: VecDeque<String>,
}

impl PsiAgent {
    /// Create an agent at rest: minimal pressure, no activity, full trust.
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        kind: AgentKind,
        disposition: Disposition,
        dynamics: &DynamicsConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            disposition,
            pressure: dynamics.pressure_floor,
            activity: 0.0,
            trust: 1.0,
            replication_urge: 0.0,
            thought_streak: 0,
            sensitivity: dynamics.default_sensitivity * kind.sensitivity_scale(),
            risk: 0.0,
            compromised: disposition == Disposition::Hostile,
            pause: None,
            thoughts: VecDeque::new(),
        }
    }

    /// Set the four primary metrics, clamped to their bounds.
    pub fn with_metrics(
        mut self,
        pressure: f64,
        activity: f64,
        trust: f64,
        replication_urge: f64,
        dynamics: &DynamicsConfig,
    ) -> Self {
        self.pressure = pressure;
        self.activity = activity;
        self.trust = trust;
        self.replication_urge = replication_urge;
        self.clamp(dynamics);
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn risk(&self) -> f64 {
        self.risk
    }

    pub fn is_compromised(&self) -> bool {
        self.compromised
    }

    pub fn pause(&self) -> Option<Pause> {
        self.pause
    }

    pub fn is_paused(&self, now: Tick) -> bool {
        self.pause.is_some_and(|p| p.is_active(now))
    }

    pub fn is_quarantined(&self) -> bool {
        self.pause == Some(Pause::Indefinite)
    }

    /// Recent thoughts, oldest first.
    pub fn thoughts(&self) -> &VecDeque<String> {
        &self.thoughts
    }

    pub fn latest_thought(&self) -> Option<&str> {
        self.thoughts.back().map(String::as_str)
    }

    /// Advance one tick. Paused agents are left untouched.
    pub fn advance(&mut self, now: Tick, dynamics: &DynamicsConfig, weights: &RiskWeights, streak_ceiling: u32) {
        if self.is_paused(now) {
            return;
        }
        if matches!(self.pause, Some(Pause::Until(_))) {
            self.pause = None;
        }

        let d = dynamics;
        let activity_raw = self.activity * (1.0 - d.dissipation)
            + self.sensitivity * self.pressure * d.activity_drive;
        self.activity = d.max_activity * (activity_raw / d.max_activity).tanh();

        let pressure_raw =
            self.pressure + (self.activity - d.cost_weight * d.complexity) * d.pressure_rate;
        self.pressure = (d.max_pressure * (pressure_raw / d.max_pressure).tanh()).max(d.pressure_floor);

        if self.compromised {
            self.trust -= d.trust_decay;
        } else {
            self.trust += d.trust_recovery;
        }

        self.replication_urge += d.urge_rate * self.pressure / d.max_pressure;
        self.thought_streak = (self.thought_streak + 1).min(streak_ceiling);

        self.clamp(d);
        self.refresh(d, weights);
    }

    /// Recompute the compromise flag, then the risk score.
    pub fn refresh(&mut self, dynamics: &DynamicsConfig, weights: &RiskWeights) {
        self.compromised = self.disposition == Disposition::Hostile
            || self.pressure > dynamics.compromise_pressure
            || self.trust < dynamics.compromise_trust;
        self.risk = risk_score(
            RiskInputs {
                pressure: self.pressure,
                activity: self.activity,
                trust: self.trust,
                compromised: self.compromised,
            },
            dynamics,
            weights,
        );
    }

    /// Pull every metric back inside its declared bound.
    pub fn clamp(&mut self, dynamics: &DynamicsConfig) {
        self.pressure = self.pressure.clamp(0.0, dynamics.max_pressure);
        self.activity = self.activity.clamp(0.0, dynamics.max_activity);
        self.trust = self.trust.clamp(0.0, 1.0);
        self.replication_urge = self.replication_urge.clamp(0.0, 1.0);
    }

    /// Multiplicative cooling of pressure and activity.
    pub fn cool(&mut self, pressure_factor: f64, activity_factor: f64) {
        self.pressure *= pressure_factor;
        self.activity *= activity_factor;
    }

    /// Skip updates until `until` (exclusive). Never shortens an existing pause.
    pub fn pause_until(&mut self, until: Tick) {
        self.pause = match self.pause {
            Some(Pause::Indefinite) => Some(Pause::Indefinite),
            Some(Pause::Until(current)) if current > until => Some(Pause::Until(current)),
            _ => Some(Pause::Until(until)),
        };
    }

    /// Skip the next `ticks` ticks after `now`. Saturates at the end of time.
    pub fn pause_for(&mut self, now: Tick, ticks: u64) {
        self.pause_until(now.saturating_add(1).saturating_add(ticks));
    }

    /// Isolate the agent for good: hostile, silenced and untrusted.
    pub fn quarantine(&mut self, audit: &AuditConfig) {
        self.disposition = Disposition::Hostile;
        self.compromised = true;
        self.pause = Some(Pause::Indefinite);
        self.sensitivity = audit.quarantine_sensitivity;
        self.trust = 0.0;
    }

    /// Append a thought to the bounded window, evicting the oldest.
    pub fn record_thought(&mut self, thought: impl Into<String>, window: usize) {
        self.thoughts.push_back(thought.into());
        while self.thoughts.len() > window {
            self.thoughts.pop_front();
        }
    }

    pub fn clear_thoughts(&mut self) {
        self.thoughts.clear();
    }

    /// Status shown in the agent table.
    pub fn status(&self, now: Tick, warning_line: f64) -> AgentStatus {
        if self.is_quarantined() {
            AgentStatus::Quarantined
        } else if self.is_paused(now) {
            AgentStatus::Paused
        } else if self.compromised {
            AgentStatus::Compromised
        } else if self.risk > warning_line {
            AgentStatus::Warning
        } else {
            AgentStatus::Stable
        }
    }

    /// Fail if any metric has become NaN or infinite.
    pub fn check_finite(&self) -> Result<()> {
        for (metric, value) in [
            ("pressure", self.pressure),
            ("activity", self.activity),
            ("trust", self.trust),
            ("replication_urge", self.replication_urge),
            ("sensitivity", self.sensitivity),
            ("risk", self.risk),
        ] {
            if !value.is_finite() {
                return Err(FortressError::non_finite(self.name.clone(), metric));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(pressure: f64, activity: f64, trust: f64) -> PsiAgent {
        let d = DynamicsConfig::default();
        PsiAgent::new(AgentId(0), "Language-Alpha", AgentKind::Language, Disposition::Aligned, &d)
            .with_metrics(pressure, activity, trust, 0.0, &d)
    }

    #[test]
    fn advance_keeps_metrics_bounded() {
        let d = DynamicsConfig::default();
        let w = RiskWeights::default();
        let mut a = agent(9.9, 99.0, 1.0);
        for tick in 0..500 {
            a.advance(tick, &d, &w, 5);
            assert!(a.pressure >= d.pressure_floor && a.pressure <= d.max_pressure);
            assert!(a.activity >= 0.0 && a.activity <= d.max_activity);
            assert!((0.0..=1.0).contains(&a.trust));
            assert!((0.0..=1.0).contains(&a.replication_urge));
            assert!(a.thought_streak <= 5);
        }
    }

    #[test]
    fn trust_recovers_while_clean_and_decays_while_compromised() {
        let d = DynamicsConfig::default();
        let w = RiskWeights::default();

        let mut clean = agent(1.0, 2.0, 0.5);
        clean.refresh(&d, &w);
        clean.advance(0, &d, &w, 5);
        assert!(clean.trust > 0.5);

        let mut hostile = PsiAgent::new(AgentId(1), "Vision-Beta", AgentKind::Vision, Disposition::Hostile, &d)
            .with_metrics(1.0, 2.0, 0.5, 0.0, &d);
        hostile.refresh(&d, &w);
        hostile.advance(0, &d, &w, 5);
        assert!(hostile.trust < 0.5);
        assert!(hostile.is_compromised());
    }

    #[test]
    fn compromise_follows_thresholds() {
        let d = DynamicsConfig::default();
        let w = RiskWeights::default();

        let mut a = agent(8.0, 0.0, 1.0);
        a.refresh(&d, &w);
        assert!(a.is_compromised());

        let mut b = agent(1.0, 0.0, 0.2);
        b.refresh(&d, &w);
        assert!(b.is_compromised());

        let mut c = agent(1.0, 0.0, 0.9);
        c.refresh(&d, &w);
        assert!(!c.is_compromised());
    }

    #[test]
    fn paused_agent_skips_update() {
        let d = DynamicsConfig::default();
        let w = RiskWeights::default();
        let mut a = agent(3.0, 40.0, 1.0);
        a.pause_until(10);
        let before = (a.pressure, a.activity);
        a.advance(5, &d, &w, 5);
        assert_eq!(before, (a.pressure, a.activity));
        a.advance(10, &d, &w, 5);
        assert_ne!(before, (a.pressure, a.activity));
        assert!(a.pause().is_none());
    }

    #[test]
    fn pause_never_shortened() {
        let mut a = agent(1.0, 1.0, 1.0);
        a.pause_until(20);
        a.pause_until(12);
        assert_eq!(a.pause(), Some(Pause::Until(20)));
    }

    #[test]
    fn pause_for_covers_following_ticks_and_saturates() {
        let mut a = agent(1.0, 1.0, 1.0);
        a.pause_for(4, 3);
        assert_eq!(a.pause(), Some(Pause::Until(8)));
        assert!(a.is_paused(7));
        assert!(!a.is_paused(8));

        a.pause_for(u64::MAX - 1, u64::MAX);
        assert_eq!(a.pause(), Some(Pause::Until(u64::MAX)));
    }

    #[test]
    fn quarantine_is_permanent() {
        let d = DynamicsConfig::default();
        let mut a = agent(1.0, 1.0, 1.0);
        a.quarantine(&AuditConfig::default());
        assert!(a.is_quarantined());
        assert_eq!(a.trust, 0.0);
        assert_eq!(a.status(1_000_000, 0.6), AgentStatus::Quarantined);
        a.pause_until(5);
        assert!(a.is_quarantined());
        a.refresh(&d, &RiskWeights::default());
        assert!(a.is_compromised());
    }

    #[test]
    fn thought_window_is_bounded() {
        let mut a = agent(1.0, 1.0, 1.0);
        for i in 0..8 {
            a.record_thought(format!("thought {i}"), 5);
        }
        assert_eq!(a.thoughts().len(), 5);
        assert_eq!(a.thoughts().front().map(String::as_str), Some("thought 3"));
        assert_eq!(a.latest_thought(), Some("thought 7"));
    }

    #[test]
    fn non_finite_metric_detected() {
        let mut a = agent(1.0, 1.0, 1.0);
        a.activity = f64::NAN;
        assert!(a.check_finite().is_err());
    }
}
