//! Error types for Psi Fortress operations.
//!
//! Provides structured error handling instead of panics.

use thiserror::Error;

/// Result type for fortress operations.
pub type Result<T> = std::result::Result<T, FortressError>;

/// Errors that can occur during fortress operations.
#[derive(Debug, Clone, Error)]
pub enum FortressError {
    /// Configuration errors.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Agent-related errors.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
    /// Emergency shutdown protocol errors.
    #[error("Shutdown error: {0}")]
    Shutdown(#[from] ShutdownError),
    /// A tick could not complete; the loop halts.
    #[error("Tick failed: {0}")]
    Tick(String),
    /// I/O errors (wrapped).
    #[error("I/O error: {0}")]
    Io(String),
    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for FortressError {
    fn from(e: std::io::Error) -> Self {
        FortressError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for FortressError {
    fn from(e: serde_json::Error) -> Self {
        FortressError::Serialization(e.to_string())
    }
}

/// Agent-related errors.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// Agent not found.
    #[error("Agent not found: {0}")]
    NotFound(String),
    /// A metric left the finite range.
    #[error("Agent {agent} has non-finite {metric}")]
    NonFinite { agent: String, metric: &'static str },
}

/// Emergency shutdown protocol errors.
#[derive(Debug, Clone, Error)]
pub enum ShutdownError {
    /// A decision was submitted with no request outstanding.
    #[error("No emergency shutdown request is pending")]
    NotRequested,
    /// The fortress has already been shut down.
    #[error("Fortress has been shut down")]
    Halted,
}

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Invalid value.
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    /// Out of range.
    #[error("{field} out of range: {value} (must be {min}-{max})")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
    /// A pattern failed to compile.
    #[error("Invalid pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },
}

// Convenience constructors
impl FortressError {
    pub fn agent_not_found(id: impl Into<String>) -> Self {
        FortressError::Agent(AgentError::NotFound(id.into()))
    }

    pub fn non_finite(agent: impl Into<String>, metric: &'static str) -> Self {
        FortressError::Agent(AgentError::NonFinite {
            agent: agent.into(),
            metric,
        })
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FortressError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }

    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, value: f64) -> Self {
        FortressError::Config(ConfigError::OutOfRange {
            field: field.into(),
            min,
            max,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = FortressError::out_of_range("guard.risk_threshold", 0.0, 1.0, 1.5);
        let text = err.to_string();
        assert!(text.contains("guard.risk_threshold"));
        assert!(text.contains("1.5"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: FortressError = io.into();
        assert!(matches!(err, FortressError::Io(_)));
    }
}
