//! CLI command implementations.

pub mod init;
pub mod run;
pub mod watch;

use crate::config::Config;
use anyhow::Result;
use psi::prelude::*;
use std::sync::Arc;

/// Fortress built from `config`, appending to the configured log file plus `extra` sinks.
pub(crate) fn build_fortress(
    config: &Config,
    seed: Option<u64>,
    extra: Vec<Arc<dyn LogSink>>,
) -> Result<Fortress> {
    let mut fanout = FanoutLogSink::new().with(Arc::new(FileLogSink::new(&config.log.file)));
    for sink in extra {
        fanout = fanout.with(sink);
    }

    let mut builder = FortressBuilder::new()
        .with_config(config.fortress.clone())
        .log_sink(Arc::new(fanout));
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    Ok(builder.build()?)
}
