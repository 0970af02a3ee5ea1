//! Error types for parley.

use thiserror::Error;

use crate::remote::RunStatus;

/// Primary error type for all parley operations.
#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    /// The classifier answered with something that is not a context selection.
    #[error("Routing error: {message}")]
    Routing { message: String, raw: String },

    /// A run kept failing after the retry budget was spent.
    #[error("Run {run_id} ended as {status}: {detail}")]
    RunFailed {
        run_id: String,
        status: RunStatus,
        detail: String,
    },

    #[error("Context {0} is busy")]
    ContextBusy(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A nested session with another agent aborted.
    #[error("Delegation to {agent} failed: {source}")]
    Delegation {
        agent: String,
        #[source]
        source: Box<ParleyError>,
    },

    #[error("Operation canceled")]
    Canceled,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Routing,
    Run,
    ToolExecution,
    Unknown,
}

impl ParleyError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a routing error that keeps the raw classifier text.
    pub fn routing(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Routing {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Wrap an error raised by a nested session with `agent`.
    pub fn delegation(agent: impl Into<String>, source: ParleyError) -> Self {
        Self::Delegation {
            agent: agent.into(),
            source: Box::new(source),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::Toml(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Routing { .. } => ErrorCategory::Routing,
            Self::RunFailed { .. } => ErrorCategory::Run,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::Delegation { source, .. } => source.category(),
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether a single HTTP call that produced this error may be repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ParleyError>;
