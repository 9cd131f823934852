//! # Customer & Subscription Types
//!
//! Customers and subscriptions belong to the billing provider. We keep the
//! fields we act on and carry every other provider field through untouched,
//! so the full provider object can be handed back to the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments for creating a customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    /// Payment method token from the client; attached and used as the
    /// default for invoices
    pub payment_method: String,
}

impl NewCustomer {
    pub fn new(email: impl Into<String>, payment_method: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            payment_method: payment_method.into(),
        }
    }
}

/// A provider customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Customer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            extra: Map::new(),
        }
    }
}

/// Arguments for creating a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub customer_id: String,
    /// One subscription item per price id
    pub price_ids: Vec<String>,
    pub coupon: Option<String>,
}

impl NewSubscription {
    pub fn new(customer_id: impl Into<String>, price_ids: Vec<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            price_ids,
            coupon: None,
        }
    }

    /// Builder: attach a coupon (no-op for `None`)
    pub fn with_coupon(mut self, coupon: Option<impl Into<String>>) -> Self {
        self.coupon = coupon.map(Into::into);
        self
    }
}

/// A provider subscription record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,

    #[serde(default)]
    pub status: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subscription {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            extra: Map::new(),
        }
    }

    /// The expanded `latest_invoice.payment_intent`, if present
    fn payment_intent(&self) -> Option<&Map<String, Value>> {
        self.extra
            .get("latest_invoice")?
            .get("payment_intent")?
            .as_object()
    }

    /// True when the first payment needs customer authentication (3-D Secure)
    pub fn requires_action(&self) -> bool {
        self.payment_intent()
            .and_then(|pi| pi.get("status"))
            .and_then(Value::as_str)
            == Some("requires_action")
    }

    /// Client secret the browser uses to finish authentication
    pub fn client_secret(&self) -> Option<&str> {
        self.payment_intent()?.get("client_secret")?.as_str()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "trialing")
    }
}
