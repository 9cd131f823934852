//! # Billing Provider Trait
//!
//! The seam between the HTTP handlers and the payment provider.
//! The provider is the system of record; every method is a single
//! round-trip to its API.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  BillingProvider (trait)                    │
//! │  ├── create_customer()                                      │
//! │  ├── create_subscription()                                  │
//! │  ├── retrieve_subscription()                                │
//! │  └── list_prices()                                          │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │ StripeBilling │
//!                    └───────────────┘
//! ```

use crate::catalog::Plan;
use crate::error::BillingResult;
use crate::subscription::{Customer, NewCustomer, NewSubscription, Subscription};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Create a customer with the payment method attached as the
    /// default for invoices.
    async fn create_customer(&self, customer: &NewCustomer) -> BillingResult<Customer>;

    /// Subscribe a customer to one item per price. The returned record has
    /// `latest_invoice.payment_intent` expanded.
    async fn create_subscription(&self, subscription: &NewSubscription) -> BillingResult<Subscription>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> BillingResult<Subscription>;

    /// Resolve prices by lookup key into catalog plans.
    async fn list_prices(&self, lookup_keys: &[String]) -> BillingResult<Vec<Plan>>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared provider (dynamic dispatch)
pub type BoxedBillingProvider = Arc<dyn BillingProvider>;
