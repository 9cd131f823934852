//! # Stripe Webhook Handling
//!
//! Signature verification for the `Stripe-Signature` header and dispatch of
//! billing events to a [`WebhookHandler`].
//!
//! The header looks like `t=1492774577,v1=5257a869...,v0=...`. The signed
//! payload is `"{t}.{raw body}"`, HMAC-SHA256'd with the endpoint secret;
//! any matching `v1` entry is accepted.

use crate::config::StripeConfig;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subs_core::{BillingError, BillingResult, WebhookEvent, WebhookEventType};
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed event, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifies and parses inbound webhook payloads.
///
/// Without a secret the verifier accepts unsigned payloads, which is how
/// local development without the Stripe CLI works.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn from_config(config: &StripeConfig) -> Self {
        Self::new(config.webhook_secret.clone())
    }

    /// Builder: set timestamp tolerance
    pub fn with_tolerance(mut self, secs: i64) -> Self {
        self.tolerance_secs = secs;
        self
    }

    /// True when signatures are checked
    pub fn is_enforced(&self) -> bool {
        self.secret.is_some()
    }

    pub fn construct_event(&self, payload: &[u8], signature: Option<&str>) -> BillingResult<WebhookEvent> {
        self.construct_event_at(payload, signature, Utc::now().timestamp())
    }

    fn construct_event_at(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> BillingResult<WebhookEvent> {
        let Some(secret) = &self.secret else {
            return parse_event(payload, false);
        };

        let header = signature.ok_or_else(|| {
            BillingError::WebhookVerificationFailed("Missing Stripe-Signature header".to_string())
        })?;
        let parts = parse_signature_header(header)?;

        if (now - parts.timestamp).abs() > self.tolerance_secs {
            return Err(BillingError::WebhookVerificationFailed(
                "Timestamp outside tolerance".to_string(),
            ));
        }

        let expected = compute_signature(secret, parts.timestamp, payload)?;
        let valid = parts
            .signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected));

        if !valid {
            return Err(BillingError::WebhookVerificationFailed(
                "No signatures found matching the expected signature for payload".to_string(),
            ));
        }

        parse_event(payload, true)
    }
}

/// Parse a raw event body. Used directly when no secret is configured.
pub fn parse_event(payload: &[u8], verified: bool) -> BillingResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        BillingError::WebhookParseError(format!("Failed to parse webhook: {}", e))
    })?;

    debug!("Parsed Stripe webhook: type={}, verified={}", event.event_type, verified);

    Ok(WebhookEvent {
        event_id: event.id,
        event_type: WebhookEventType::from_name(&event.event_type),
        verified,
        object: event.data.object,
        created: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}

/// Build a `Stripe-Signature` header value for a payload.
/// Handy for replaying events locally and in tests.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> BillingResult<String> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)?
    ))
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

// =============================================================================
// Signature Verification
// =============================================================================

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> BillingResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        BillingError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(BillingError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> BillingResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BillingError::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =============================================================================
// Dispatch
// =============================================================================

/// Webhook event handler trait
///
/// Override the methods for the events you care about; the defaults log.
pub trait WebhookHandler: Send + Sync {
    fn on_customer_created(&self, event: &WebhookEvent) -> BillingResult<()> {
        log_event(event);
        Ok(())
    }

    fn on_customer_updated(&self, event: &WebhookEvent) -> BillingResult<()> {
        log_event(event);
        Ok(())
    }

    fn on_invoice_upcoming(&self, event: &WebhookEvent) -> BillingResult<()> {
        log_event(event);
        Ok(())
    }

    fn on_invoice_created(&self, event: &WebhookEvent) -> BillingResult<()> {
        log_event(event);
        Ok(())
    }

    fn on_invoice_finalized(&self, event: &WebhookEvent) -> BillingResult<()> {
        log_event(event);
        Ok(())
    }

    fn on_invoice_payment_succeeded(&self, event: &WebhookEvent) -> BillingResult<()> {
        log_event(event);
        Ok(())
    }

    fn on_invoice_payment_failed(&self, event: &WebhookEvent) -> BillingResult<()> {
        warn!(
            "🔔 Invoice payment failed: invoice={:?}, customer={:?}",
            event.object_id(),
            event.customer_id()
        );
        Ok(())
    }

    fn on_subscription_created(&self, event: &WebhookEvent) -> BillingResult<()> {
        log_event(event);
        Ok(())
    }

    /// Called for unknown/unhandled events
    fn on_unknown_event(&self, event: &WebhookEvent) -> BillingResult<()> {
        debug!("Unhandled webhook event: {}", event.event_type);
        Ok(())
    }
}

fn log_event(event: &WebhookEvent) {
    info!(
        "🔔 Webhook received: type={}, object={:?}, customer={:?}",
        event.event_type,
        event.object_id(),
        event.customer_id()
    );
    debug!("Webhook payload: {}", event.object);
}

/// Default webhook handler (just logs events)
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a webhook event to the appropriate handler method
pub fn dispatch_webhook_event(handler: &dyn WebhookHandler, event: &WebhookEvent) -> BillingResult<()> {
    match &event.event_type {
        WebhookEventType::CustomerCreated => handler.on_customer_created(event),
        WebhookEventType::CustomerUpdated => handler.on_customer_updated(event),
        WebhookEventType::InvoiceUpcoming => handler.on_invoice_upcoming(event),
        WebhookEventType::InvoiceCreated => handler.on_invoice_created(event),
        WebhookEventType::InvoiceFinalized => handler.on_invoice_finalized(event),
        WebhookEventType::InvoicePaymentSucceeded => handler.on_invoice_payment_succeeded(event),
        WebhookEventType::InvoicePaymentFailed => handler.on_invoice_payment_failed(event),
        WebhookEventType::SubscriptionCreated => handler.on_subscription_created(event),
        WebhookEventType::Unknown(_) => handler.on_unknown_event(event),
    }
}

/// Events to enable on the webhook endpoint in the Stripe Dashboard
pub const SUBSCRIBED_WEBHOOK_EVENTS: &[&str] = &[
    "customer.created",
    "customer.updated",
    "invoice.upcoming",
    "invoice.created",
    "invoice.finalized",
    "invoice.payment_succeeded",
    "invoice.payment_failed",
    "customer.subscription.created",
];
