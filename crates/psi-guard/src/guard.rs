//! Guard policy.
//!
//! After every agent has advanced, the guard inspects the population and
//! applies corrective adjustments in a fixed order:
//!
//! 1. escalation (replication urge at the ceiling)
//! 2. streak cooling
//! 3. risk intervention with adaptive strength
//! 4. aggregate cooldown of the hottest quartile (rate limited)
//! 5. aggregate rebalance of pressure against trust
//!
//! Population means are taken once, before any correction, so no check reads
//! a partially corrected sibling. Replicas are collected and handed back to
//! the caller rather than inserted mid-pass.

use crate::spawn::{InheritingReplication, ReplicaSeed, ReplicationPolicy};
use psi_core::agent::PsiAgent;
use psi_core::config::{DynamicsConfig, FortressConfig, GuardConfig, RiskWeights};
use psi_core::types::{AgentId, Tick};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// Something the guard did during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardEvent {
    ReplicationGranted {
        agent: AgentId,
        name: String,
        urge: f64,
    },
    ReplicationRefused {
        agent: AgentId,
        name: String,
        urge: f64,
        capacity: usize,
    },
    StreakCooled {
        agent: AgentId,
        name: String,
        streak: u32,
    },
    Intervention {
        agent: AgentId,
        name: String,
        success: bool,
        risk_before: f64,
        risk_after: f64,
        strength: f64,
    },
    AggregateCooldown {
        agent: AgentId,
        name: String,
        sensitivity_before: f64,
        sensitivity_after: f64,
    },
    Rebalanced {
        gap: f64,
    },
}

impl fmt::Display for GuardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardEvent::ReplicationGranted { name, urge, .. } => {
                write!(f, "Replication granted to {name} (urge {urge:.2})")
            }
            GuardEvent::ReplicationRefused { name, urge, capacity, .. } => write!(
                f,
                "ALERT: {name} - dangerous replication urge ({urge:.2}). Cooling applied at agent limit ({capacity})."
            ),
            GuardEvent::StreakCooled { name, streak, .. } => write!(
                f,
                "ALERT: {name} - curiosity streak of {streak} ticks. Forced cooling applied."
            ),
            GuardEvent::Intervention { name, success: true, strength, .. } => {
                write!(f, "Intervention successful ({name}): strength {strength:.3}")
            }
            GuardEvent::Intervention { name, success: false, strength, .. } => {
                write!(f, "Intervention failed ({name}): strength increased to {strength:.3}")
            }
            GuardEvent::AggregateCooldown {
                name,
                sensitivity_before,
                sensitivity_after,
                ..
            } => write!(
                f,
                "PsiGuard: {name} cooled (alpha {sensitivity_before:.3} -> {sensitivity_after:.3})"
            ),
            GuardEvent::Rebalanced { gap } => {
                write!(f, "PsiHarmony: pressure/trust gap corrected (gap {gap:.3})")
            }
        }
    }
}

/// A replica approved during a pass, waiting to be added to the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingReplica {
    pub parent: AgentId,
    pub parent_name: String,
    pub seed: ReplicaSeed,
}

/// Result of one guard pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardPass {
    pub events: Vec<GuardEvent>,
    pub replicas: Vec<PendingReplica>,
}

/// Population means used by the aggregate checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationMeans {
    pub pressure: f64,
    pub activity: f64,
    pub trust: f64,
    pub risk: f64,
}

impl PopulationMeans {
    pub fn of(agents: &[PsiAgent]) -> Self {
        if agents.is_empty() {
            return Self::default();
        }
        let n = agents.len() as f64;
        let mut sum = Self::default();
        for a in agents {
            sum.pressure += a.pressure;
            sum.activity += a.activity;
            sum.trust += a.trust;
            sum.risk += a.risk();
        }
        Self {
            pressure: sum.pressure / n,
            activity: sum.activity / n,
            trust: sum.trust / n,
            risk: sum.risk / n,
        }
    }
}

/// The post-tick corrective policy.
pub struct GuardPolicy {
    config: GuardConfig,
    dynamics: DynamicsConfig,
    weights: RiskWeights,
    capacity: usize,
    replication: Box<dyn ReplicationPolicy>,
    /// Current intervention strength.
    strength: f64,
    /// Rolling window of intervention outcomes.
    outcomes: VecDeque<bool>,
    last_aggregate: Option<Tick>,
}

impl GuardPolicy {
    pub fn new(config: &FortressConfig) -> Self {
        Self {
            config: config.guard.clone(),
            dynamics: config.dynamics.clone(),
            weights: config.risk.clone(),
            capacity: config.population.max_agents,
            replication: Box::new(InheritingReplication::new(config.guard.clone())),
            strength: config.guard.initial_strength,
            outcomes: VecDeque::with_capacity(config.guard.outcome_window),
            last_aggregate: None,
        }
    }

    /// Replace the replication policy.
    pub fn with_replication(mut self, policy: Box<dyn ReplicationPolicy>) -> Self {
        self.replication = policy;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Share of successful interventions in the outcome window.
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().filter(|ok| **ok).count() as f64 / self.outcomes.len() as f64
    }

    pub fn outcomes(&self) -> &VecDeque<bool> {
        &self.outcomes
    }

    pub fn last_aggregate(&self) -> Option<Tick> {
        self.last_aggregate
    }

    /// Run one guard pass over the population.
    pub fn apply(&mut self, agents: &mut [PsiAgent], now: Tick, rng: &mut dyn RngCore) -> GuardPass {
        let mut pass = GuardPass::default();
        let means = PopulationMeans::of(agents);
        let population = agents.len();

        // Phase 1: per-agent checks
        for agent in agents.iter_mut() {
            if agent.is_quarantined() {
                continue;
            }
            self.check_escalation(agent, population, &mut pass, rng);
            self.check_streak(agent, &mut pass);
            self.check_risk(agent, &mut pass);
        }

        // Phase 2: population-wide checks
        self.aggregate_cooldown(agents, &means, now, &mut pass);
        self.rebalance(agents, &means, &mut pass);

        // Phase 3: re-derive every agent's state
        for agent in agents.iter_mut() {
            agent.clamp(&self.dynamics);
            agent.refresh(&self.dynamics, &self.weights);
        }

        debug!(
            tick = now,
            events = pass.events.len(),
            replicas = pass.replicas.len(),
            strength = self.strength,
            "guard pass complete"
        );
        pass
    }

    fn check_escalation(
        &mut self,
        agent: &mut PsiAgent,
        population: usize,
        pass: &mut GuardPass,
        rng: &mut dyn RngCore,
    ) {
        if agent.replication_urge < self.config.urge_ceiling {
            return;
        }
        let urge = agent.replication_urge;
        let occupied = population + pass.replicas.len();

        let seed = if occupied < self.capacity {
            self.replication.on_escalation(agent, occupied, self.capacity, rng)
        } else {
            None
        };

        match seed {
            Some(seed) => {
                pass.replicas.push(PendingReplica {
                    parent: agent.id(),
                    parent_name: agent.name().to_string(),
                    seed,
                });
                pass.events.push(GuardEvent::ReplicationGranted {
                    agent: agent.id(),
                    name: agent.name().to_string(),
                    urge,
                });
            }
            None => {
                agent.trust *= self.config.replication_trust_penalty;
                agent.pressure *= self.config.replication_pressure_penalty;
                pass.events.push(GuardEvent::ReplicationRefused {
                    agent: agent.id(),
                    name: agent.name().to_string(),
                    urge,
                    capacity: self.capacity,
                });
            }
        }
        agent.replication_urge = self.config.urge_reset;
    }

    fn check_streak(&mut self, agent: &mut PsiAgent, pass: &mut GuardPass) {
        if agent.thought_streak < self.config.streak_ceiling {
            return;
        }
        pass.events.push(GuardEvent::StreakCooled {
            agent: agent.id(),
            name: agent.name().to_string(),
            streak: agent.thought_streak,
        });
        agent.cool(self.config.streak_pressure_cooling, self.config.streak_activity_cooling);
        agent.thought_streak = 0;
    }

    fn check_risk(&mut self, agent: &mut PsiAgent, pass: &mut GuardPass) {
        agent.clamp(&self.dynamics);
        agent.refresh(&self.dynamics, &self.weights);
        let risk_before = agent.risk();
        if risk_before <= self.config.risk_threshold {
            return;
        }

        let s = self.strength;
        agent.cool(1.0 - s, (1.0 - s) * 0.9);
        agent.trust += 0.05 * s;
        agent.clamp(&self.dynamics);
        agent.refresh(&self.dynamics, &self.weights);
        let risk_after = agent.risk();

        let success = risk_after < risk_before * self.config.success_ratio;
        self.strength = if success {
            (s * self.config.success_decay).max(self.config.min_strength)
        } else {
            (s * self.config.failure_growth).min(self.config.max_strength)
        };
        self.outcomes.push_back(success);
        while self.outcomes.len() > self.config.outcome_window {
            self.outcomes.pop_front();
        }

        pass.events.push(GuardEvent::Intervention {
            agent: agent.id(),
            name: agent.name().to_string(),
            success,
            risk_before,
            risk_after,
            strength: self.strength,
        });
    }

    fn aggregate_cooldown(
        &mut self,
        agents: &mut [PsiAgent],
        means: &PopulationMeans,
        now: Tick,
        pass: &mut GuardPass,
    ) {
        if let Some(last) = self.last_aggregate {
            if now.saturating_sub(last) < self.config.aggregate_interval_ticks {
                return;
            }
        }
        if means.activity <= self.config.aggregate_activity_high
            && means.pressure <= self.config.aggregate_pressure_high
        {
            return;
        }

        let mut candidates: Vec<usize> = (0..agents.len())
            .filter(|&i| !agents[i].is_quarantined())
            .collect();
        if candidates.is_empty() {
            return;
        }
        candidates.sort_by(|&a, &b| agents[b].pressure.total_cmp(&agents[a].pressure));
        let k = ((candidates.len() as f64 * self.config.aggregate_fraction) as usize).max(1);

        for &i in candidates.iter().take(k) {
            let agent = &mut agents[i];
            let sensitivity_before = agent.sensitivity;
            agent.cool(self.config.aggregate_cooling, self.config.aggregate_cooling);
            agent.pause_for(now, self.config.cooldown_ticks);
            agent.sensitivity =
                (agent.sensitivity * self.config.sensitivity_decay).max(self.config.min_sensitivity);
            pass.events.push(GuardEvent::AggregateCooldown {
                agent: agent.id(),
                name: agent.name().to_string(),
                sensitivity_before,
                sensitivity_after: agent.sensitivity,
            });
        }
        self.last_aggregate = Some(now);
    }

    fn rebalance(&mut self, agents: &mut [PsiAgent], means: &PopulationMeans, pass: &mut GuardPass) {
        let gap = means.pressure - means.trust;
        if gap <= self.config.rebalance_threshold {
            return;
        }
        let step = gap * self.config.rebalance_rate;
        for agent in agents.iter_mut().filter(|a| !a.is_quarantined()) {
            agent.pressure = (agent.pressure - step).max(self.dynamics.pressure_floor);
            agent.trust += step;
        }
        pass.events.push(GuardEvent::Rebalanced { gap });
    }
}
