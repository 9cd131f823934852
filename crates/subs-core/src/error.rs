//! # Billing Error Types
//!
//! Typed error handling for the subscription backend.
//! All billing operations return `Result<T, BillingError>`.

use thiserror::Error;

/// Core error type for all billing operations
#[derive(Debug, Error)]
pub enum BillingError {
    /// Configuration errors (missing keys, unreadable catalog)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Price id not present in the configured catalog
    #[error("Unknown price id: {price_id}")]
    UnknownPrice { price_id: String },

    /// Billing provider rejected the call.
    /// `status` is the HTTP status the provider answered with, if any.
    #[error("{message}")]
    Provider { status: Option<u16>, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Shorthand for a provider error
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        BillingError::Provider {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the error came from the billing provider itself
    pub fn is_provider_error(&self) -> bool {
        matches!(self, BillingError::Provider { .. } | BillingError::Network(_))
    }

    /// Returns the HTTP status code appropriate for this error.
    ///
    /// Provider client errors (card declined, missing resource) keep the
    /// provider's own 4xx status; anything else from the provider is a 502.
    pub fn status_code(&self) -> u16 {
        match self {
            BillingError::Configuration(_) => 500,
            BillingError::InvalidRequest(_) => 400,
            BillingError::UnknownPrice { .. } => 400,
            BillingError::Provider {
                status: Some(status),
                ..
            } if (400..500).contains(status) => *status,
            BillingError::Provider { .. } => 502,
            BillingError::Network(_) => 503,
            BillingError::WebhookVerificationFailed(_) => 401,
            BillingError::WebhookParseError(_) => 400,
            BillingError::Serialization(_) => 500,
            BillingError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Serialization(err.to_string())
    }
}

/// Result type alias for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
