use thiserror::Error;

/// Canonical error type for load-run configuration and setup.
#[derive(Debug, Error)]
pub enum StampedeError {
    /// Load profile is structurally invalid.
    #[error("invalid load profile: {message}")]
    InvalidProfile {
        /// Human-readable explanation of the violation.
        message: String,
    },

    /// Threshold expression could not be parsed or does not apply to its metric.
    #[error("invalid threshold `{expression}`: {message}")]
    InvalidThreshold {
        /// The offending predicate expression.
        expression: String,
        /// Human-readable explanation of the violation.
        message: String,
    },

    /// Duration string could not be parsed.
    #[error("invalid duration `{input}`: {message}")]
    InvalidDuration {
        /// The offending input string.
        input: String,
        /// Human-readable explanation of the violation.
        message: String,
    },

    /// Runner configuration is invalid.
    #[error("invalid runner configuration: {message}")]
    InvalidRunner {
        /// Human-readable explanation of the violation.
        message: String,
    },

    /// Configuration file or environment layering failed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    /// I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StampedeError {
    /// Creates an `InvalidProfile` variant.
    #[must_use]
    pub fn invalid_profile(message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            message: message.into(),
        }
    }

    /// Creates an `InvalidThreshold` variant.
    #[must_use]
    pub fn invalid_threshold(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidThreshold {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Creates an `InvalidDuration` variant.
    #[must_use]
    pub fn invalid_duration(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates an `InvalidRunner` variant.
    #[must_use]
    pub fn invalid_runner(message: impl Into<String>) -> Self {
        Self::InvalidRunner {
            message: message.into(),
        }
    }
}

/// Convenient result alias for load-run operations.
pub type StampedeResult<T> = Result<T, StampedeError>;
