//! Error types shared across cliptrim crates.

use std::path::PathBuf;

/// Top-level error type for cliptrim operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    /// An operation was requested against state that cannot support it,
    /// e.g. compiling an export with no segments.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Boundary violation: {message}")]
    BoundaryViolation { message: String },

    #[error("{tool} exited with {status}: {stderr}")]
    ExternalProcess {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to start {tool}: {source}")]
    ProcessSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("An export is already running")]
    ConcurrentExportRejected,

    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Document error at {path}: {message}")]
    Document { path: PathBuf, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Lines of external stderr kept in [`ClipError::ExternalProcess`].
pub const STDERR_TAIL_LINES: usize = 20;

/// Result type alias using ClipError.
pub type ClipResult<T> = Result<T, ClipError>;

impl ClipError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn boundary(msg: impl Into<String>) -> Self {
        Self::BoundaryViolation {
            message: msg.into(),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Failure of an external tool. Only the last lines of its stderr are
    /// kept; ffmpeg prints its banner and stream info before the cause.
    pub fn external(
        tool: impl Into<String>,
        status: impl std::fmt::Display,
        stderr: &str,
    ) -> Self {
        let lines: Vec<&str> = stderr.trim().lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        Self::ExternalProcess {
            tool: tool.into(),
            status: status.to_string(),
            stderr: tail,
        }
    }

    pub fn spawn(tool: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessSpawn {
            tool: tool.into(),
            source,
        }
    }

    /// Whether the error came from an external tool rather than from
    /// the edit state itself.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ExternalProcess { .. } | Self::ProcessSpawn { .. }
        )
    }
}
