//! # Psi
//!
//! A guarded population of simulated agents.
//!
//! Each agent carries a few bounded scalars (pressure, activity, trust,
//! replication urge) that evolve every tick. A guard policy watches the
//! population and applies dampening corrections when thresholds are crossed;
//! a thought audit scans the agents' templated reactions to stimuli; an
//! emergency-shutdown latch waits for a human decision.
//!
//! ## Quick Start
//!
//! ```rust
//! use psi::prelude::*;
//!
//! let mut fortress = FortressBuilder::new().seed(42).build().unwrap();
//!
//! fortress.inject_stimulus("How to secure peace?");
//! let snapshot = fortress.run(20).unwrap();
//!
//! for row in &snapshot.agents {
//!     println!("{:<16} risk {:.2} {}", row.name, row.risk, row.status);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`psi_core`] - Agent state, update rule, risk scoring, configuration, errors
//! - [`psi_guard`] - Guard policy, replication policies, stimulus classification, thought audit
//! - [`psi_runtime`] - The `Fortress` controller, snapshots, event log sinks, async tick loop
//!
//! ## Tick Order
//!
//! | Phase | What happens |
//! |-------|--------------|
//! | Advance | Each unpaused agent applies its saturating update rule |
//! | Guard | Escalation, streak, risk, aggregate cooldown, rebalance |
//! | Replicas | Approved replicas join, up to the population cap |
//! | Audit | Forbidden thoughts, replication talk, curiosity runaway |
//! | History | Means appended to the rolling history |

pub use psi_core;
pub use psi_guard;
pub use psi_runtime;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    //! Everything needed to build and drive a fortress.
    pub use psi_runtime::prelude::*;
}
