//! Notification channel trait

use super::message::NotificationMessage;
use crate::error::NotifierError;

/// Delivery result
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// Delivered; carries the HTTP status the endpoint answered with
    Sent { status: u16 },
    /// Nothing was delivered (gate, unannounced status, dry-run)
    Skipped(String),
}

impl SendResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendResult::Sent { .. })
    }
}

/// Notification channel
pub trait NotificationChannel: Send + Sync {
    /// Channel name (logging)
    fn name(&self) -> &str;

    /// Deliver one message synchronously
    fn send(&self, message: &NotificationMessage) -> Result<SendResult, NotifierError>;
}
