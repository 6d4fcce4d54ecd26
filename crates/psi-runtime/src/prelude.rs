//! Psi Runtime prelude.
//!
//! ```rust
//! use psi_runtime::prelude::*;
//! ```

// Re-export the controller
pub use crate::fortress::{Fortress, StimulusReport};
pub use crate::builder::FortressBuilder;

// Re-export snapshots
pub use crate::snapshot::{AgentRow, FortressSnapshot, FortressStats, GuardStatus, HistoryPoint};

// Re-export log sinks
pub use crate::log::{
    format_line, FanoutLogSink, FileLogSink, LogSink, MemoryLogSink, NullLogSink, TracingLogSink,
    DEFAULT_LOG_FILE,
};

pub use crate::export::{export_snapshot, load_snapshot, SnapshotExport};

// Re-export the async runner when the feature is enabled
#[cfg(feature = "async")]
pub use crate::runner::{FortressHandle, RunStatus, DEFAULT_TICK_INTERVAL};

// Re-export from guard
pub use psi_guard::prelude::*;
