//! Psi Core prelude: convenient imports for common usage.
//!
//! ```rust
//! use psi_core::prelude::*;
//! ```

pub use crate::types::{
    replica_name, seeded_name,
    AgentId, AgentKind, AgentStatus, Disposition, Pause, Tick,
};

pub use crate::agent::PsiAgent;

pub use crate::config::{
    AuditConfig, DynamicsConfig, FortressConfig, GuardConfig,
    PopulationConfig, RiskWeights, StimulusConfig,
};

pub use crate::risk::{risk_score, RiskInputs};

pub use crate::error::{AgentError, ConfigError, FortressError, Result, ShutdownError};
