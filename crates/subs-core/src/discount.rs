//! # Discount Policy
//!
//! Multi-plan purchases at or above a threshold get the configured coupon.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_ITEMS_FOR_DISCOUNT: usize = 2;
pub const DEFAULT_DISCOUNT_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Provider coupon id; no coupon is ever attached when unset
    pub coupon_id: Option<String>,

    /// Item count at which the coupon applies
    pub min_items_for_discount: usize,

    /// Price multiplier the client shows for discounted carts.
    /// Display only: the provider applies the coupon itself.
    pub discount_factor: f64,
}

impl DiscountPolicy {
    pub fn new(coupon_id: Option<String>, min_items_for_discount: usize) -> Self {
        Self {
            coupon_id,
            min_items_for_discount,
            discount_factor: DEFAULT_DISCOUNT_FACTOR,
        }
    }

    /// Builder: set display discount factor
    pub fn with_discount_factor(mut self, factor: f64) -> Self {
        self.discount_factor = factor;
        self
    }

    pub fn is_eligible(&self, item_count: usize) -> bool {
        item_count >= self.min_items_for_discount
    }

    /// Coupon to attach for a purchase of `item_count` plans
    pub fn coupon_for(&self, item_count: usize) -> Option<&str> {
        if self.is_eligible(item_count) {
            self.coupon_id.as_deref()
        } else {
            None
        }
    }

    /// Preview total for a cart, in the smallest currency unit
    pub fn discounted_total(&self, unit_amounts: &[i64]) -> i64 {
        let total: i64 = unit_amounts.iter().sum();
        if self.is_eligible(unit_amounts.len()) {
            (total as f64 * self.discount_factor).round() as i64
        } else {
            total
        }
    }
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self::new(None, DEFAULT_MIN_ITEMS_FOR_DISCOUNT)
    }
}
