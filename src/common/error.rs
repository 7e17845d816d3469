//! Error handling primitives shared across the core.
//!
//! Nothing in the crate retries; errors carry a stable code so the HTTP and
//! CLI layers can map them without string matching.

use thiserror::Error;

/// Stable error codes surfaced to callers.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MonitorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// A required configuration value is absent or malformed.
    Config = 1,
    /// Input failed validation (missing or malformed columns).
    InvalidInput = 2,
    /// No model version matched the requested stage.
    ModelMissing = 3,
    /// A collaborator (blob store, registry, workspace) failed.
    Dependency = 4,
    /// The requested model flavour has no loader.
    Unsupported = 5,
    /// Catch-all for bugs.
    Internal = 6,
}

impl MonitorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorCode::Ok => "ok",
            MonitorCode::Config => "config",
            MonitorCode::InvalidInput => "invalid_input",
            MonitorCode::ModelMissing => "model_missing",
            MonitorCode::Dependency => "dependency",
            MonitorCode::Unsupported => "unsupported",
            MonitorCode::Internal => "internal",
        }
    }
}

/// Canonical error type for the core.
#[derive(Clone, Debug, Error)]
#[error("{}: {msg}", code.as_str())]
pub struct MonitorError {
    /// Machine parsable error code.
    pub code: MonitorCode,
    /// Developer facing message.
    pub msg: String,
}

/// Result alias used throughout the crate.
pub type MonitorResult<T> = Result<T, MonitorError>;

impl MonitorError {
    /// Create a new error with the provided code and message.
    pub fn new(code: MonitorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }

    /// Configuration helper.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(MonitorCode::Config, msg)
    }

    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(MonitorCode::InvalidInput, msg)
    }

    /// Model missing helper.
    pub fn model_missing(msg: impl Into<String>) -> Self {
        Self::new(MonitorCode::ModelMissing, msg)
    }

    /// Collaborator failure helper.
    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::new(MonitorCode::Dependency, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(MonitorCode::Unsupported, msg)
    }

    /// Internal error helper.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(MonitorCode::Internal, msg)
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        Self::dependency(format!("io: {err}"))
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::dependency(format!("json: {err}"))
    }
}

impl From<serde_yaml::Error> for MonitorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::dependency(format!("yaml: {err}"))
    }
}

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        Self::dependency(format!("csv: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(MonitorCode::Ok as u32, 0);
        assert_eq!(MonitorCode::Config as u32, 1);
        assert_eq!(MonitorCode::InvalidInput as u32, 2);
        assert_eq!(MonitorCode::ModelMissing as u32, 3);
        assert_eq!(MonitorCode::Dependency as u32, 4);
        assert_eq!(MonitorCode::Unsupported as u32, 5);
        assert_eq!(MonitorCode::Internal as u32, 6);
    }

    #[test]
    fn display_includes_code_name() {
        let err = MonitorError::config("window size missing");
        assert_eq!(err.to_string(), "config: window size missing");
    }

    #[test]
    fn io_errors_map_to_dependency() {
        let err: MonitorError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code, MonitorCode::Dependency);
    }
}
