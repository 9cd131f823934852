//! # subs-core
//!
//! Core types and traits for the multi-plan subscription backend.
//!
//! This crate provides:
//! - `Plan` and `PlanCatalog` for the configured plan catalog
//! - `DiscountPolicy` for the multi-plan coupon rule
//! - `Customer` and `Subscription` records owned by the provider
//! - `WebhookEvent` for inbound provider notifications
//! - `BillingProvider` trait implemented by payment providers
//! - `BillingError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use subs_core::{DiscountPolicy, NewCustomer, NewSubscription, PlanCatalog};
//!
//! let plans = catalog.validate_selection(&price_ids)?;
//! let coupon = policy.coupon_for(plans.len());
//!
//! let customer = provider.create_customer(&NewCustomer::new(email, payment_method)).await?;
//! let subscription = provider
//!     .create_subscription(&NewSubscription::new(customer.id, price_ids).with_coupon(coupon))
//!     .await?;
//! ```

pub mod catalog;
pub mod discount;
pub mod error;
pub mod event;
pub mod provider;
pub mod subscription;

// Re-exports for convenience
pub use catalog::{Currency, Plan, PlanCatalog};
pub use discount::DiscountPolicy;
pub use error::{BillingError, BillingResult};
pub use event::{WebhookEvent, WebhookEventType};
pub use provider::{BillingProvider, BoxedBillingProvider};
pub use subscription::{Customer, NewCustomer, NewSubscription, Subscription};
