//! # subs-stripe
//!
//! Stripe billing provider for the multi-plan subscription backend.
//!
//! - **StripeBilling**: `BillingProvider` over the Customers,
//!   Subscriptions and Prices REST APIs
//! - **WebhookVerifier**: `Stripe-Signature` verification and event parsing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use subs_stripe::StripeBilling;
//! use subs_core::{BillingProvider, NewCustomer, NewSubscription};
//!
//! let stripe = StripeBilling::from_env()?;
//!
//! let customer = stripe
//!     .create_customer(&NewCustomer::new("jenny@example.com", "pm_card_visa"))
//!     .await?;
//! let subscription = stripe
//!     .create_subscription(&NewSubscription::new(customer.id, vec!["price_123".into()]))
//!     .await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use subs_stripe::{dispatch_webhook_event, LoggingWebhookHandler, WebhookVerifier};
//!
//! let verifier = WebhookVerifier::from_config(stripe.config());
//! let event = verifier.construct_event(&body, signature_header)?;
//! dispatch_webhook_event(&LoggingWebhookHandler, &event)?;
//! ```

pub mod billing;
pub mod client;
pub mod config;
pub mod webhook;

// Re-exports
pub use billing::StripeBilling;
pub use config::StripeConfig;
pub use webhook::{
    dispatch_webhook_event, sign_payload, LoggingWebhookHandler, WebhookHandler, WebhookVerifier,
    SUBSCRIBED_WEBHOOK_EVENTS,
};
