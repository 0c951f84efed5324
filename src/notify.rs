//! Outbound webhook delivery.
//!
//! One POST per trigger, JSON body, bounded timeout, no internal retry.
//! Retry policy belongs to the caller; this boundary only classifies
//! failures and never raises past `DeliveryError`.

use serde::Serialize;
use std::time::Duration;

const CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Message delivered to the configured webhook.
#[derive(Clone, Debug, Serialize)]
pub struct NotificationMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Why a delivery attempt failed.
#[derive(Debug)]
pub enum DeliveryError {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// Network error, timeout, or malformed payload.
    Transport(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Status(code) => write!(f, "webhook answered with status {}", code),
            DeliveryError::Transport(msg) => write!(f, "webhook delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

pub struct Notifier {
    webhook_url: String,
    agent: ureq::Agent,
}

impl Notifier {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            webhook_url: webhook_url.into(),
            agent,
        }
    }

    /// POST one message. Any 2xx is success; everything else, including
    /// timeouts, comes back as a `DeliveryError`.
    pub fn send(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        let body = serde_json::to_string(message)
            .map_err(|e| DeliveryError::Transport(format!("serialize message: {}", e)))?;
        match self
            .agent
            .post(&self.webhook_url)
            .set("Content-Type", CONTENT_TYPE)
            .send_string(&body)
        {
            Ok(response) => {
                log::debug!("webhook accepted with status {}", response.status());
                Ok(())
            }
            Err(ureq::Error::Status(code, _)) => Err(DeliveryError::Status(code)),
            Err(ureq::Error::Transport(t)) => Err(DeliveryError::Transport(t.to_string())),
        }
    }
}
