//! Error taxonomy for webhook processing and trigger delivery.
//!
//! Errors are scoped: extraction and signature errors abort the whole
//! request, matching and delivery errors belong to one rule. The web
//! boundary translates them into status codes.

use thiserror::Error;

/// Result type alias for trigger operations.
pub type Result<T> = std::result::Result<T, TriggerError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TriggerError {
    /// Request body is not a JSON object.
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// `X-Hub-Signature` did not verify against the shared secret.
    #[error("signature verification failed")]
    SignatureMismatch,

    /// The rule has no conditions configured for this event kind.
    #[error("event {event} not supported by rule for endpoint {endpoint}")]
    UnsupportedEvent { endpoint: String, event: String },

    /// An integer configuration value could not be parsed.
    #[error("invalid value {value:?} for {field} on endpoint {endpoint}")]
    ConfigValueInvalid {
        endpoint: String,
        field: &'static str,
        value: String,
    },

    /// One delivery attempt failed in a way worth retrying.
    #[error("transient delivery failure: {reason}")]
    TransientDeliveryFailure { reason: String },

    /// Every attempt in the retry budget failed.
    #[error("unable to post to endpoint {path} after {attempts} attempts")]
    DeliveryExhausted { path: String, attempts: u32 },

    /// Forwarding the raw payload to a static URL failed.
    #[error("forward to {url} failed: {message}")]
    ForwardFailed { url: String, message: String },
}

impl TriggerError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientDeliveryFailure {
            reason: reason.into(),
        }
    }

    pub fn unsupported(endpoint: impl Into<String>, event: impl Into<String>) -> Self {
        Self::UnsupportedEvent {
            endpoint: endpoint.into(),
            event: event.into(),
        }
    }

    /// Whether the error aborts the inbound request rather than one rule.
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. } | Self::SignatureMismatch | Self::ForwardFailed { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientDeliveryFailure { .. })
    }
}
