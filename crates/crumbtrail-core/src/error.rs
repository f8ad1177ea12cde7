//! Unified error types for the crumbtrail core library.
//!
//! [`CrumbtrailError`] covers every failure mode the recorder can report.
//! Modules keep their own specific error types ([`StorageError`],
//! [`ConfigError`]) and convert into this one at their boundary.
//!
//! # Example
//!
//! ```rust
//! use crumbtrail_core::error::{CrumbtrailError, Result};
//!
//! fn connect(reason_code: i32) -> Result<()> {
//!     Err(CrumbtrailError::ConnectionFailed { reason_code })
//! }
//! assert!(connect(8).unwrap_err().is_connection_error());
//! ```

use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// The unified error type for all crumbtrail operations.
#[derive(Debug, Error)]
pub enum CrumbtrailError {
    // =========================================================================
    // CONNECTION ERRORS
    // =========================================================================
    /// The position source interrupted the connection. A reconnect is attempted automatically.
    #[error("Position source connection suspended (reason {reason_code}); reconnecting")]
    ConnectionSuspended {
        /// Source-specific reason code.
        reason_code: i32,
    },

    /// The position source could not connect. Not retried until the host starts again.
    #[error("Position source connection failed (reason {reason_code})")]
    ConnectionFailed {
        /// Source-specific reason code.
        reason_code: i32,
    },

    // =========================================================================
    // STORAGE ERRORS
    // =========================================================================
    /// Reading or writing the trail failed.
    #[error("Trail storage error: {0}")]
    Storage(#[from] StorageError),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found.
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for crumbtrail operations.
pub type Result<T> = std::result::Result<T, CrumbtrailError>;

/// Short alias for [`CrumbtrailError`].
pub type Error = CrumbtrailError;

impl CrumbtrailError {
    /// Returns `true` if this error comes from the position source connection.
    #[inline]
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionSuspended { .. } | Self::ConnectionFailed { .. }
        )
    }

    /// Returns `true` if this error comes from trail storage.
    #[inline]
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if the recorder recovers from this error on its own.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConnectionSuspended { .. })
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::ConfigNotFound(_) => 404,
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,
            Self::Storage(_) | Self::IoError(_) => 500,
            Self::ConnectionSuspended { .. } | Self::ConnectionFailed { .. } => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionSuspended { .. } => "CONNECTION_SUSPENDED",
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<ConfigError> for CrumbtrailError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::ReadError { source, .. } | ConfigError::WriteError { source, .. } => {
                Self::IoError(source)
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
