//! # Psi Runtime
//!
//! Population management and drivers for the Psi Fortress simulation.
//!
//! The [`Fortress`](fortress::Fortress) owns the agents and runs one tick at
//! a time: agent updates, the guard pass, replica admission, the thought
//! audit and history bookkeeping. It can be stepped by hand, or handed to a
//! [`FortressHandle`](runner::FortressHandle) that drives it from a tokio
//! task and publishes immutable snapshots to readers.

pub mod builder;
pub mod export;
pub mod fortress;
pub mod log;
pub mod prelude;
pub mod snapshot;

#[cfg(feature = "async")]
pub mod runner;
