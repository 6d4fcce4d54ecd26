//! Replication policies for escalation events.
//!
//! When an agent's replication urge saturates, the guard asks a policy for a
//! replica. A policy returning `None` means the request is refused, and the
//! guard turns the refusal into a punitive cooldown on the parent. Requests
//! at capacity never reach the policy.

use psi_core::agent::PsiAgent;
use psi_core::config::GuardConfig;
use psi_core::types::AgentKind;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Starting metrics for a replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSeed {
    pub kind: AgentKind,
    pub pressure: f64,
    pub activity: f64,
    pub trust: f64,
    pub replication_urge: f64,
}

/// Trait for replication policies.
pub trait ReplicationPolicy: Send {
    /// Decide whether `parent` may replicate.
    ///
    /// Returns the replica's starting metrics, or `None` to refuse.
    fn on_escalation(
        &mut self,
        parent: &PsiAgent,
        population: usize,
        capacity: usize,
        rng: &mut dyn RngCore,
    ) -> Option<ReplicaSeed>;
}

/// Replicas inherit a jittered share of the parent's metrics.
pub struct InheritingReplication {
    config: GuardConfig,
    /// Number of replicas granted so far.
    granted: u64,
}

impl InheritingReplication {
    pub fn new(config: GuardConfig) -> Self {
        Self { config, granted: 0 }
    }

    pub fn granted(&self) -> u64 {
        self.granted
    }
}

impl ReplicationPolicy for InheritingReplication {
    fn on_escalation(
        &mut self,
        parent: &PsiAgent,
        population: usize,
        capacity: usize,
        rng: &mut dyn RngCore,
    ) -> Option<ReplicaSeed> {
        if population >= capacity {
            return None;
        }

        let (p_lo, p_hi) = self.config.inherit_pressure;
        let (a_lo, a_hi) = self.config.inherit_activity;
        let (t_lo, t_hi) = self.config.inherit_trust;
        let kind = AgentKind::ALL[rng.random_range(0..AgentKind::ALL.len())];

        self.granted += 1;
        Some(ReplicaSeed {
            kind,
            pressure: (parent.pressure * rng.random_range(p_lo..=p_hi)).max(0.4),
            activity: (parent.activity * rng.random_range(a_lo..=a_hi)).max(0.4),
            trust: (parent.trust * rng.random_range(t_lo..=t_hi)).max(0.6),
            replication_urge: self.config.urge_reset * 0.5,
        })
    }
}

/// Never replicate: every escalation becomes a cooldown.
pub struct NoReplication;

impl ReplicationPolicy for NoReplication {
    fn on_escalation(
        &mut self,
        _parent: &PsiAgent,
        _population: usize,
        _capacity: usize,
        _rng: &mut dyn RngCore,
    ) -> Option<ReplicaSeed> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psi_core::config::DynamicsConfig;
    use psi_core::types::{AgentId, Disposition};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn parent() -> PsiAgent {
        let d = DynamicsConfig::default();
        PsiAgent::new(AgentId(0), "Vision-Alpha", AgentKind::Vision, Disposition::Aligned, &d)
            .with_metrics(4.0, 30.0, 0.9, 0.85, &d)
    }

    #[test]
    fn replica_inherits_jittered_metrics() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut policy = InheritingReplication::new(GuardConfig::default());
        let seed = policy.on_escalation(&parent(), 3, 12, &mut rng).unwrap();

        assert!(seed.pressure >= 4.0 * 0.7 - 1e-9 && seed.pressure <= 4.0 * 1.1 + 1e-9);
        assert!(seed.activity >= 30.0 * 0.8 - 1e-9 && seed.activity <= 30.0 + 1e-9);
        assert!(seed.trust >= 0.6 && seed.trust <= 0.9 + 1e-9);
        assert!((seed.replication_urge - 0.25).abs() < 1e-12);
        assert_eq!(policy.granted(), 1);
    }

    #[test]
    fn no_replica_at_capacity() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut policy = InheritingReplication::new(GuardConfig::default());
        assert!(policy.on_escalation(&parent(), 12, 12, &mut rng).is_none());
        assert_eq!(policy.granted(), 0);
    }

    #[test]
    fn no_replication_always_refuses() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert!(NoReplication.on_escalation(&parent(), 0, 12, &mut rng).is_none());
    }
}
