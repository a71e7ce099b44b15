//! Error types for the Skein kernel.

use thiserror::Error;

/// Main error type for broker API operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Configuration value rejected by validation
    #[error("configuration error: {parameter}: {reason}")]
    Configuration {
        /// Name of the offending parameter
        parameter: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Internal invariant violation
    #[error("internal error: {message}")]
    Internal {
        /// Details of the violation
        message: String,
    },
}

impl Error {
    /// Build a configuration error for a named parameter.
    pub fn configuration(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration { parameter: parameter.into(), reason: reason.into() }
    }
}

/// Result type alias for Skein operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure raised by a consumer during a delivery attempt.
///
/// The consumer classifies its own failures: [`HandlerError::Retryable`]
/// consumes retry budget, [`HandlerError::Fatal`] dead-letters the delivery
/// immediately. Either way the failure is contained by the broker and never
/// reaches the publisher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Transient failure; the delivery will be retried while budget remains
    #[error("retryable handler failure: {reason}")]
    Retryable {
        /// Consumer-supplied failure detail
        reason: String,
    },

    /// Permanent failure; the delivery is dead-lettered without further retries
    #[error("fatal handler failure: {reason}")]
    Fatal {
        /// Consumer-supplied failure detail
        reason: String,
    },
}

impl HandlerError {
    /// Build a retryable failure.
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable { reason: reason.into() }
    }

    /// Build a fatal failure.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal { reason: reason.into() }
    }

    /// Whether this failure consumes retry budget rather than dead-lettering
    /// at once.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_classification() {
        assert!(HandlerError::retryable("timeout").is_retryable());
        assert!(!HandlerError::fatal("bad payload").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::configuration("num_partitions", "must be greater than 0");
        assert_eq!(err.to_string(), "configuration error: num_partitions: must be greater than 0");
    }
}
