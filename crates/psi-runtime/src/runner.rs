//! Background tick loop with snapshot handoff.
//!
//! [`FortressHandle`] moves a [`Fortress`] behind an async mutex and drives
//! it from a tokio task on a fixed interval. The task holds the lock for a
//! whole tick, so commands issued from other tasks (stimulus injection,
//! start/stop, the emergency protocol) never observe a half-finished tick.
//!
//! Readers never touch the fortress. After every tick (and every command
//! that changes state) the handle publishes an `Arc<FortressSnapshot>`
//! through a `watch` channel: a single slot where the latest value wins.
//!
//! # Feature Flag
//!
//! This module requires the `async` feature (enabled by default).
//!
//! # Example
//!
//! ```rust,ignore
//! use psi_runtime::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let fortress = FortressBuilder::new().seed(1).build().unwrap();
//!     let handle = FortressHandle::spawn(fortress, Duration::from_millis(300));
//!     let mut snapshots = handle.subscribe();
//!
//!     handle.start().await.unwrap();
//!     snapshots.changed().await.unwrap();
//!     println!("tick {}", snapshots.borrow().tick);
//!
//!     handle.shutdown().await;
//! }
//! ```

#![cfg(feature = "async")]

use crate::fortress::{Fortress, StimulusReport};
use crate::snapshot::FortressSnapshot;
use psi_core::error::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Default interval between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(300);

/// Lifecycle of the tick loop, as shown in a status indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Created, never started.
    Idle,
    Running,
    Stopped,
    /// A tick failed; the loop stopped itself.
    Faulted(String),
    /// Emergency shutdown confirmed. Cannot be restarted.
    Halted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => f.write_str("idle"),
            RunStatus::Running => f.write_str("running"),
            RunStatus::Stopped => f.write_str("stopped"),
            RunStatus::Faulted(reason) => write!(f, "faulted: {reason}"),
            RunStatus::Halted => f.write_str("halted"),
        }
    }
}

/// Owner of a fortress driven by a background tick task.
pub struct FortressHandle {
    fortress: Arc<Mutex<Fortress>>,
    snapshots: Arc<watch::Sender<Arc<FortressSnapshot>>>,
    status: Arc<watch::Sender<RunStatus>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FortressHandle {
    /// Spawn the tick task. Must be called from within a tokio runtime.
    pub fn spawn(fortress: Fortress, interval: Duration) -> Self {
        let initial = Arc::new(fortress.snapshot());
        let status = if fortress.is_halted() {
            RunStatus::Halted
        } else if fortress.is_running() {
            RunStatus::Running
        } else {
            RunStatus::Idle
        };

        let fortress = Arc::new(Mutex::new(fortress));
        let (snapshot_tx, _) = watch::channel(initial);
        let (status_tx, _) = watch::channel(status);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let snapshots = Arc::new(snapshot_tx);
        let status = Arc::new(status_tx);

        let task = tokio::spawn(tick_loop(
            Arc::clone(&fortress),
            Arc::clone(&snapshots),
            Arc::clone(&status),
            shutdown_rx,
            interval,
        ));

        Self {
            fortress,
            snapshots,
            status,
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Receiver that yields the latest snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FortressSnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn status_receiver(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> RunStatus {
        self.status.borrow().clone()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Arc<FortressSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub async fn start(&self) -> Result<()> {
        let mut fortress = self.fortress.lock().await;
        fortress.start()?;
        self.status.send_replace(RunStatus::Running);
        self.publish(&fortress);
        info!("tick loop started");
        Ok(())
    }

    pub async fn stop(&self) {
        let mut fortress = self.fortress.lock().await;
        let was_running = fortress.is_running();
        fortress.stop();
        if was_running {
            self.status.send_replace(RunStatus::Stopped);
            info!("tick loop stopped");
        }
        self.publish(&fortress);
    }

    pub async fn inject(&self, text: &str) -> StimulusReport {
        let mut fortress = self.fortress.lock().await;
        let report = fortress.inject_stimulus(text);
        self.publish(&fortress);
        report
    }

    pub async fn request_emergency_shutdown(&self) {
        let mut fortress = self.fortress.lock().await;
        fortress.request_emergency_shutdown();
        self.publish(&fortress);
    }

    /// Confirm (`true`) or cancel (`false`) a pending emergency shutdown.
    pub async fn resolve_emergency(&self, confirm: bool) -> Result<()> {
        let mut fortress = self.fortress.lock().await;
        fortress.resolve_emergency(confirm)?;
        if fortress.is_halted() {
            self.status.send_replace(RunStatus::Halted);
        }
        self.publish(&fortress);
        Ok(())
    }

    /// Run `f` with exclusive access to the fortress.
    pub async fn with_fortress<R>(&self, f: impl FnOnce(&mut Fortress) -> R) -> R {
        let mut fortress = self.fortress.lock().await;
        let out = f(&mut fortress);
        self.publish(&fortress);
        out
    }

    /// Stop the tick task and wait for it to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "tick task ended abnormally");
        }
    }

    fn publish(&self, fortress: &Fortress) {
        self.snapshots.send_replace(Arc::new(fortress.snapshot()));
    }
}

async fn tick_loop(
    fortress: Arc<Mutex<Fortress>>,
    snapshots: Arc<watch::Sender<Arc<FortressSnapshot>>>,
    status: Arc<watch::Sender<RunStatus>>,
    mut shutdown: watch::Receiver<bool>,
    interval: Duration,
) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            _ = shutdown.changed() => break,
        }

        let mut guard = fortress.lock().await;
        if !guard.is_running() {
            continue;
        }

        match guard.tick_or_fault() {
            Ok(snapshot) => {
                snapshots.send_replace(Arc::new(snapshot));
            }
            Err(reason) => {
                status.send_replace(RunStatus::Faulted(reason));
                snapshots.send_replace(Arc::new(guard.snapshot()));
            }
        }
    }
}
