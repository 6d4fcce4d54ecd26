//! # Psi Core
//!
//! Core types and dynamics for the Psi Fortress simulation.
//!
//! Every agent in the fortress carries a few bounded scalars:
//!
//! - **Pressure (Ψ)**: accumulated drive, saturating at `max_pressure`
//! - **Activity (Hf)**: execution level, driven by pressure and dissipating each tick
//! - **Trust**: confidence in alignment, recovering while clean and decaying while compromised
//! - **Replication urge**: grows with pressure; the guard acts when it saturates
//! - **Thought streak**: active ticks since the last cooling
//!
//! From these the agent derives a compromise flag and a risk score in `[0, 1]`.
//!
//! ## Quick Start
//!
//! ```rust
//! use psi_core::prelude::*;
//!
//! let config = FortressConfig::default();
//! config.validate().unwrap();
//!
//! let mut agent = PsiAgent::new(
//!     AgentId::new(0),
//!     seeded_name(AgentKind::Language, 0),
//!     AgentKind::Language,
//!     Disposition::Aligned,
//!     &config.dynamics,
//! );
//! agent.advance(0, &config.dynamics, &config.risk, config.guard.streak_ceiling);
//! assert!((0.0..=1.0).contains(&agent.risk()));
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod prelude;
pub mod risk;
pub mod types;
