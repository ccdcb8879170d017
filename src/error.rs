//! Notifier error types
//!
//! Setup errors (`InvalidFilter`, `MissingSecretRef`, `UnresolvedSecret`,
//! `SecretFetch`, `HttpClient`) are fatal for a notifier instance. Per-event
//! errors (`Serialization`, `Delivery`) are returned to the caller and never
//! affect other events.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifierError {
    /// The filter expression could not be compiled.
    #[error("failed to compile filter {expression:?}: {message}")]
    InvalidFilter { expression: String, message: String },

    /// The delivery config has no secret reference for the field.
    #[error("delivery config has no secret ref for field {field:?}")]
    MissingSecretRef { field: String },

    /// No entry in `spec.secrets` carries the referenced name.
    #[error("failed to find secret for ref {name:?}")]
    UnresolvedSecret { name: String },

    /// The secret store could not return the value.
    #[error("failed to get secret {resource:?}: {message}")]
    SecretFetch { resource: String, message: String },

    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The message could not be encoded as JSON.
    #[error("unable to marshal payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure while posting to the webhook.
    #[error("webhook delivery failed: {0}")]
    Delivery(#[source] reqwest::Error),
}

impl NotifierError {
    /// Whether the error belongs to setup rather than to a single event
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            NotifierError::InvalidFilter { .. }
                | NotifierError::MissingSecretRef { .. }
                | NotifierError::UnresolvedSecret { .. }
                | NotifierError::SecretFetch { .. }
                | NotifierError::HttpClient(_)
        )
    }
}
