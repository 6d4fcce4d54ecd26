//! Fortress builder.
//!
//! # Example
//!
//! ```rust
//! use psi_runtime::builder::FortressBuilder;
//! use psi_runtime::log::MemoryLogSink;
//! use std::sync::Arc;
//!
//! let log = MemoryLogSink::new(100);
//! let mut fortress = FortressBuilder::new()
//!     .seed(7)
//!     .max_agents(6)
//!     .initial_agents(4)
//!     .log_sink(Arc::new(log.clone()))
//!     .build()
//!     .unwrap();
//!
//! fortress.run(10).unwrap();
//! assert!(!log.is_empty());
//! ```

use crate::fortress::Fortress;
use crate::log::{LogSink, NullLogSink};
use psi_core::config::FortressConfig;
use psi_core::error::Result;
use psi_guard::spawn::ReplicationPolicy;
use std::sync::Arc;

/// Builder for [`Fortress`].
pub struct FortressBuilder {
    config: FortressConfig,
    sink: Option<Arc<dyn LogSink>>,
    replication: Option<Box<dyn ReplicationPolicy>>,
}

impl Default for FortressBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FortressBuilder {
    pub fn new() -> Self {
        Self {
            config: FortressConfig::default(),
            sink: None,
            replication: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: FortressConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn initial_agents(mut self, n: usize) -> Self {
        self.config.population.initial_agents = n;
        self
    }

    pub fn max_agents(mut self, n: usize) -> Self {
        self.config.population.max_agents = n;
        self
    }

    pub fn hostile_fraction(mut self, fraction: f64) -> Self {
        self.config.population.hostile_fraction = fraction;
        self
    }

    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn replication(mut self, policy: Box<dyn ReplicationPolicy>) -> Self {
        self.replication = Some(policy);
        self
    }

    pub fn build(self) -> Result<Fortress> {
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullLogSink));
        Fortress::assemble(self.config, sink, self.replication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psi_guard::spawn::NoReplication;

    #[test]
    fn build_with_defaults() {
        let fortress = FortressBuilder::new().seed(1).build().unwrap();
        assert_eq!(fortress.agents().len(), 8);
        assert_eq!(fortress.config().population.max_agents, 12);
    }

    #[test]
    fn build_rejects_oversized_population() {
        let result = FortressBuilder::new().initial_agents(20).max_agents(4).build();
        assert!(result.is_err());
    }

    #[test]
    fn custom_replication_policy_is_used() {
        let mut fortress = FortressBuilder::new()
            .seed(2)
            .replication(Box::new(NoReplication))
            .build()
            .unwrap();
        for agent in fortress.agents_mut() {
            agent.replication_urge = 0.95;
        }
        fortress.tick().unwrap();
        assert_eq!(fortress.agents().len(), 8);
        assert_eq!(fortress.stats().replicas_created, 0);
    }
}
