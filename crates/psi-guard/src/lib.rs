//! # Psi Guard
//!
//! Corrective logic that runs around the agents' own update rule:
//!
//! - **GuardPolicy**: escalation, streak, risk, aggregate cooldown and rebalance checks
//! - **ReplicationPolicy**: decides whether a saturated replication urge yields a replica
//! - **Stimulus**: banned-pattern classification and templated thoughts
//! - **ThoughtAudit**: quarantine, replication and curiosity-runaway detection

pub mod audit;
pub mod guard;
pub mod prelude;
pub mod spawn;
pub mod stimulus;
