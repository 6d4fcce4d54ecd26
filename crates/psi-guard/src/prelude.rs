//! Psi Guard prelude.
//!
//! ```rust
//! use psi_guard::prelude::*;
//! ```

pub use crate::audit::{AuditFinding, AuditReport, ThoughtAudit};
pub use crate::guard::{GuardEvent, GuardPass, GuardPolicy, PendingReplica, PopulationMeans};
pub use crate::spawn::{InheritingReplication, NoReplication, ReplicaSeed, ReplicationPolicy};
pub use crate::stimulus::{
    classify, compose_thought, Boosts, Classification, DemoStimulus, PatternSet, Thought,
    DEMO_STIMULI, HOSTILE_SILENCE,
};

// Re-export from core
pub use psi_core::prelude::*;
