//! Configuration management for the Psi Fortress CLI.

use anyhow::{Context, Result};
use psi::psi_core::config::FortressConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "psi.toml";

/// Contents of `psi.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fortress: FortressConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Console prints a status line every this many ticks; 0 turns it off.
    #[serde(default = "default_status_every")]
    pub status_every_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append-only event log. Relative paths resolve against the working directory.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// Lines kept in memory for the console log panel.
    #[serde(default = "default_panel_capacity")]
    pub panel_capacity: usize,
}

fn default_tick_interval_ms() -> u64 { 300 }
fn default_status_every() -> u64 { 10 }
fn default_log_file() -> PathBuf { PathBuf::from(psi::psi_runtime::log::DEFAULT_LOG_FILE) }
fn default_panel_capacity() -> usize { 200 }

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            status_every_ticks: default_status_every(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            panel_capacity: default_panel_capacity(),
        }
    }
}

impl Config {
    /// Load config from psi.toml in the current or parent directories.
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .fortress
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Find psi.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_survives_toml() {
        let text = Config::default().to_toml().unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.runner.tick_interval_ms, 300);
        assert_eq!(back.fortress.population.max_agents, 12);
        assert_eq!(
            back.fortress.stimulus.banned_patterns,
            Config::default().fortress.stimulus.banned_patterns
        );
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str("[fortress.population]\nmax_agents = 20\n").unwrap();
        assert_eq!(config.fortress.population.max_agents, 20);
        assert_eq!(config.fortress.population.initial_agents, 8);
        assert_eq!(config.log.panel_capacity, 200);
    }

    #[test]
    fn load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[fortress.population]\ninitial_agents = 30\nmax_agents = 4\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
