//! Adapter error taxonomy
//!
//! Every backend failure is normalized into one of five kinds before it
//! reaches the caller. Adapters never retry and never swallow: a failed
//! operation rejects with exactly one of these.

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by any data adapter.
///
/// The four named kinds cover the classifiable failures shared by all
/// backends; [`AdapterError::Adapter`] is the generic remainder, tagged with
/// a backend-specific `code` such as `HTTP_500`.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Transport failure, timeout, or an unclassified backend fault.
    #[error("{message}")]
    Network {
        message: String,
        details: Option<Value>,
    },

    /// The backend rejected the request as malformed or invalid.
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    /// Missing or insufficient credentials. Token refresh is the caller's
    /// concern, not this layer's.
    #[error("{message}")]
    Authentication {
        message: String,
        details: Option<Value>,
    },

    /// The targeted record or endpoint does not exist.
    #[error("{message}")]
    NotFound {
        message: String,
        details: Option<Value>,
    },

    /// Structural or otherwise unclassified adapter failure.
    #[error("{message}")]
    Adapter {
        message: String,
        code: String,
        details: Option<Value>,
    },
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

impl AdapterError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            details: None,
        }
    }

    pub fn network_with(message: impl Into<String>, details: Value) -> Self {
        Self::Network {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            details: None,
        }
    }

    pub fn authentication_with(message: impl Into<String>, details: Value) -> Self {
        Self::Authentication {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found_with(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn adapter(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Adapter {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn adapter_with(
        message: impl Into<String>,
        code: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::Adapter {
            message: message.into(),
            code: code.into(),
            details: Some(details),
        }
    }

    /// Error for an operation the adapter does not implement.
    pub fn unsupported(operation: &str) -> Self {
        Self::adapter(
            format!("adapter does not support {operation}"),
            "UNSUPPORTED_OPERATION",
        )
    }

    /// The stable kind tag for this error.
    pub fn code(&self) -> &str {
        match self {
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication { .. } => "AUTH_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Adapter { code, .. } => code,
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::Network { message, .. }
            | Self::Validation { message, .. }
            | Self::Authentication { message, .. }
            | Self::NotFound { message, .. }
            | Self::Adapter { message, .. } => message,
        }
    }

    /// Backend-native diagnostics attached at classification time.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Network { details, .. }
            | Self::Validation { details, .. }
            | Self::Authentication { details, .. }
            | Self::NotFound { details, .. }
            | Self::Adapter { details, .. } => details.as_ref(),
        }
    }
}
