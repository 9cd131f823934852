//! # Plan Catalog
//!
//! The set of purchasable plans offered to the browser client.
//! Loaded once at startup from a JSON/TOML file, an inline JSON value,
//! or a live price listing from the billing provider.

use crate::error::{BillingError, BillingResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
        }
    }

    /// Parse a provider currency code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "usd" => Some(Currency::USD),
            "eur" => Some(Currency::EUR),
            "gbp" => Some(Currency::GBP),
            "jpy" => Some(Currency::JPY),
            "cad" => Some(Currency::CAD),
            "aud" => Some(Currency::AUD),
            _ => None,
        }
    }

    /// Number of decimal places (JPY has 0, the rest 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Format an amount in the smallest unit for display (e.g. "$5.00")
    pub fn display(&self, amount: i64) -> String {
        let symbol = match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
        };
        if self.decimal_places() == 0 {
            format!("{}{}", symbol, amount)
        } else {
            format!("{}{:.2}", symbol, amount as f64 / 100.0)
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A purchasable monthly plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Provider price id (e.g. "price_1Hh1...")
    #[serde(alias = "planId")]
    pub id: String,

    /// Display title
    pub title: String,

    /// Display emoji
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,

    /// Monthly cost in the smallest currency unit
    pub unit_amount: i64,

    #[serde(default)]
    pub currency: Currency,

    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Provider lookup key this price was resolved from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_key: Option<String>,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Plan {
    pub fn new(id: impl Into<String>, title: impl Into<String>, unit_amount: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            emoji: None,
            unit_amount,
            currency: Currency::USD,
            image_url: None,
            lookup_key: None,
            active: true,
        }
    }

    /// Builder: set emoji
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Builder: set lookup key
    pub fn with_lookup_key(mut self, key: impl Into<String>) -> Self {
        self.lookup_key = Some(key.into());
        self
    }

    /// Formatted monthly price
    pub fn display_price(&self) -> String {
        self.currency.display(self.unit_amount)
    }
}

/// Read-only plan catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanCatalog {
    #[serde(default)]
    pub plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new() -> Self {
        Self { plans: Vec::new() }
    }

    pub fn from_plans(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// Find an active plan by price id
    pub fn get(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id && p.active)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All active plans, in catalog order
    pub fn active_plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter().filter(|p| p.active)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Check a client selection against the catalog.
    ///
    /// Rejects an empty selection, duplicate ids and any id not offered
    /// by an active plan. Returns the selected plans in request order.
    pub fn validate_selection<S: AsRef<str>>(&self, price_ids: &[S]) -> BillingResult<Vec<&Plan>> {
        if price_ids.is_empty() {
            return Err(BillingError::InvalidRequest(
                "No plans selected".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(price_ids.len());
        for id in price_ids {
            let id = id.as_ref();
            if !seen.insert(id) {
                return Err(BillingError::InvalidRequest(format!(
                    "Plan selected more than once: {}",
                    id
                )));
            }
            let plan = self.get(id).ok_or_else(|| BillingError::UnknownPrice {
                price_id: id.to_string(),
            })?;
            selected.push(plan);
        }

        Ok(selected)
    }

    /// Load catalog from a JSON array of plans (or `{"plans": [...]}`)
    pub fn from_json(json: &str) -> BillingResult<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Doc {
            List(Vec<Plan>),
            Catalog(PlanCatalog),
        }

        let doc: Doc = serde_json::from_str(json)
            .map_err(|e| BillingError::Configuration(format!("Invalid plan catalog: {}", e)))?;
        Ok(match doc {
            Doc::List(plans) => Self::from_plans(plans),
            Doc::Catalog(catalog) => catalog,
        })
    }

    /// Load catalog from a TOML document with `[[plans]]` tables
    pub fn from_toml(toml_str: &str) -> BillingResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| BillingError::Configuration(format!("Invalid plan catalog: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PlanCatalog {
        PlanCatalog::from_plans(vec![
            Plan::new("price_bremen", "Bremen", 500).with_emoji("🐓"),
            Plan::new("price_pasha", "Pasha", 500).with_emoji("🐈"),
            Plan::new("price_lulu", "Lulu", 700),
        ])
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Plan::new("p", "P", 599).display_price(), "$5.99");
        assert_eq!(Currency::JPY.display(1000), "¥1000");
        assert_eq!(Currency::EUR.display(1999), "€19.99");
    }

    #[test]
    fn test_validate_selection() {
        let catalog = catalog();
        let selected = catalog
            .validate_selection(&["price_lulu", "price_bremen"])
            .unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].title, "Lulu");
    }

    #[test]
    fn test_validate_selection_rejects_unknown() {
        let err = catalog()
            .validate_selection(&["price_bremen", "price_unknown"])
            .unwrap_err();
        assert!(matches!(err, BillingError::UnknownPrice { ref price_id } if price_id == "price_unknown"));
    }

    #[test]
    fn test_validate_selection_rejects_empty_and_duplicates() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            catalog().validate_selection(&empty),
            Err(BillingError::InvalidRequest(_))
        ));
        assert!(matches!(
            catalog().validate_selection(&["price_pasha", "price_pasha"]),
            Err(BillingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_inactive_plans_are_hidden() {
        let mut catalog = catalog();
        catalog.plans[2].active = false;
        assert!(!catalog.contains("price_lulu"));
        assert_eq!(catalog.active_plans().count(), 2);
    }

    #[test]
    fn test_from_json_array_with_aliases() {
        let json = r#"[
            {"planId": "price_a", "title": "A", "unit_amount": 500, "image": "/img/a.png"},
            {"id": "price_b", "title": "B", "emoji": "🐕", "unit_amount": 900, "currency": "eur"}
        ]"#;
        let catalog = PlanCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.plans[0].image_url.as_deref(), Some("/img/a.png"));
        assert_eq!(catalog.plans[1].currency, Currency::EUR);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            [[plans]]
            id = "price_a"
            title = "A"
            unit_amount = 500
        "#;
        let catalog = PlanCatalog::from_toml(toml).unwrap();
        assert!(catalog.contains("price_a"));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            PlanCatalog::from_json("{not json"),
            Err(BillingError::Configuration(_))
        ));
    }
}
