//! Snapshot export.
//!
//! Writes a snapshot, its run totals and the rolling history as pretty JSON
//! so a finished headless run can be inspected later.

use crate::fortress::Fortress;
use crate::snapshot::{FortressSnapshot, FortressStats, HistoryPoint};
use psi_core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything written by [`export_snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotExport {
    pub snapshot: FortressSnapshot,
    pub stats: FortressStats,
    pub history: Vec<HistoryPoint>,
}

impl SnapshotExport {
    pub fn capture(fortress: &Fortress) -> Self {
        Self {
            snapshot: fortress.snapshot(),
            stats: fortress.stats(),
            history: fortress.history().iter().copied().collect(),
        }
    }
}

/// Write the fortress's current state to `path` as JSON.
pub fn export_snapshot(fortress: &Fortress, path: impl AsRef<Path>) -> Result<SnapshotExport> {
    let export = SnapshotExport::capture(fortress);
    let json = serde_json::to_string_pretty(&export)?;
    std::fs::write(path, json)?;
    Ok(export)
}

/// Read an export written by [`export_snapshot`].
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<SnapshotExport> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FortressBuilder;

    #[test]
    fn export_writes_readable_json() {
        let mut fortress = FortressBuilder::new().seed(11).build().unwrap();
        fortress.run(5).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final.json");
        let written = export_snapshot(&fortress, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(loaded.snapshot.tick, 5);
        assert_eq!(loaded.history.len(), 5);
        assert_eq!(loaded.stats, written.stats);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, psi_core::error::FortressError::Io(_)));
    }
}
