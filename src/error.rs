//! Error types for the matchmaking logic service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to react to a specific failure
//! downcast to [`MmLogicError`].

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking logic scenarios
#[derive(Debug, thiserror::Error)]
pub enum MmLogicError {
    #[error("State storage error: {message}")]
    StorageError { message: String },

    #[error("Filter on '{attribute}' applies to too many players ({count} > {ceiling})")]
    FilterTooBroad {
        attribute: String,
        count: i64,
        ceiling: i64,
    },

    #[error("Failed to send response: {message}")]
    TransportSendError { message: String },

    #[error("Unknown ignorelist: {name}")]
    UnknownIgnoreList { name: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MmLogicError {
    /// Shorthand for the most common failure in this crate
    pub fn storage(message: impl Into<String>) -> Self {
        MmLogicError::StorageError {
            message: message.into(),
        }
    }

    /// Classify this error for metrics labels
    pub fn kind(&self) -> ErrorKind {
        match self {
            MmLogicError::StorageError { .. } => ErrorKind::Storage,
            MmLogicError::FilterTooBroad { .. } => ErrorKind::FilterTooBroad,
            MmLogicError::TransportSendError { .. } => ErrorKind::TransportSend,
            MmLogicError::UnknownIgnoreList { .. } | MmLogicError::ConfigurationError { .. } => {
                ErrorKind::Configuration
            }
            MmLogicError::InternalError { .. } => ErrorKind::Internal,
        }
    }
}

/// Coarse error classification used by observers
///
/// An empty filter range is not an error; it travels as
/// [`FilterOutcome::NoMatchingPlayers`](crate::pool::FilterOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Storage,
    FilterTooBroad,
    TransportSend,
    Configuration,
    Internal,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Storage,
        ErrorKind::FilterTooBroad,
        ErrorKind::TransportSend,
        ErrorKind::Configuration,
        ErrorKind::Internal,
    ];

    /// Classify any error flowing through the crate
    pub fn of(error: &anyhow::Error) -> Self {
        error
            .downcast_ref::<MmLogicError>()
            .map(MmLogicError::kind)
            .unwrap_or(ErrorKind::Internal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Storage => "storage",
            ErrorKind::FilterTooBroad => "filter_too_broad",
            ErrorKind::TransportSend => "transport_send",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
