//! # Webhook Events
//!
//! Provider-neutral view of an inbound webhook notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Webhook event types we act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    CustomerCreated,
    CustomerUpdated,
    InvoiceUpcoming,
    InvoiceCreated,
    InvoiceFinalized,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    SubscriptionCreated,
    /// Unknown event (passthrough)
    Unknown(String),
}

impl WebhookEventType {
    /// Map a provider event name (e.g. "invoice.created")
    pub fn from_name(name: &str) -> Self {
        match name {
            "customer.created" => WebhookEventType::CustomerCreated,
            "customer.updated" => WebhookEventType::CustomerUpdated,
            "invoice.upcoming" => WebhookEventType::InvoiceUpcoming,
            "invoice.created" => WebhookEventType::InvoiceCreated,
            "invoice.finalized" => WebhookEventType::InvoiceFinalized,
            "invoice.payment_succeeded" => WebhookEventType::InvoicePaymentSucceeded,
            "invoice.payment_failed" => WebhookEventType::InvoicePaymentFailed,
            "customer.subscription.created" => WebhookEventType::SubscriptionCreated,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::CustomerCreated => "customer.created",
            WebhookEventType::CustomerUpdated => "customer.updated",
            WebhookEventType::InvoiceUpcoming => "invoice.upcoming",
            WebhookEventType::InvoiceCreated => "invoice.created",
            WebhookEventType::InvoiceFinalized => "invoice.finalized",
            WebhookEventType::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            WebhookEventType::InvoicePaymentFailed => "invoice.payment_failed",
            WebhookEventType::SubscriptionCreated => "customer.subscription.created",
            WebhookEventType::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, WebhookEventType::Unknown(_))
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider (empty for unsigned test payloads without one)
    pub event_id: String,

    pub event_type: WebhookEventType,

    /// Whether the signature was checked
    pub verified: bool,

    /// The `data.object` payload
    pub object: serde_json::Value,

    pub created: DateTime<Utc>,
}

impl WebhookEvent {
    /// Id of the object the event is about (customer, invoice, subscription)
    pub fn object_id(&self) -> Option<&str> {
        self.object.get("id").and_then(|v| v.as_str())
    }

    /// Customer the object belongs to; a customer object is its own customer
    pub fn customer_id(&self) -> Option<&str> {
        match self.event_type {
            WebhookEventType::CustomerCreated | WebhookEventType::CustomerUpdated => {
                self.object_id()
            }
            _ => self.object.get("customer").and_then(|v| v.as_str()),
        }
    }
}
