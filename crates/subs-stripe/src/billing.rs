//! # Stripe Billing
//!
//! `BillingProvider` backed by the Stripe Customers, Subscriptions and
//! Prices APIs.

use crate::client::{Params, StripeClient};
use crate::config::StripeConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use subs_core::{
    BillingError, BillingProvider, BillingResult, Currency, Customer, NewCustomer,
    NewSubscription, Plan, Subscription,
};
use tracing::{info, instrument, warn};

pub struct StripeBilling {
    client: StripeClient,
}

impl StripeBilling {
    pub fn new(config: StripeConfig) -> BillingResult<Self> {
        Ok(Self {
            client: StripeClient::new(config)?,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        self.client.config()
    }

    fn customer_params(customer: &NewCustomer) -> Params {
        vec![
            ("email".to_string(), customer.email.clone()),
            ("payment_method".to_string(), customer.payment_method.clone()),
            (
                "invoice_settings[default_payment_method]".to_string(),
                customer.payment_method.clone(),
            ),
        ]
    }

    fn subscription_params(subscription: &NewSubscription) -> Params {
        let mut params: Params = vec![("customer".to_string(), subscription.customer_id.clone())];

        for (i, price_id) in subscription.price_ids.iter().enumerate() {
            params.push((format!("items[{}][price]", i), price_id.clone()));
        }

        params.push((
            "expand[]".to_string(),
            "latest_invoice.payment_intent".to_string(),
        ));

        if let Some(ref coupon) = subscription.coupon {
            params.push(("discounts[0][coupon]".to_string(), coupon.clone()));
        }

        params
    }

    fn price_query(lookup_keys: &[String]) -> Params {
        let mut query: Params = lookup_keys
            .iter()
            .map(|key| ("lookup_keys[]".to_string(), key.clone()))
            .collect();
        query.push(("expand[]".to_string(), "data.product".to_string()));
        query.push(("active".to_string(), "true".to_string()));
        query.push(("limit".to_string(), "100".to_string()));
        query
    }
}

#[async_trait]
impl BillingProvider for StripeBilling {
    #[instrument(skip(self, customer), fields(email = %customer.email))]
    async fn create_customer(&self, customer: &NewCustomer) -> BillingResult<Customer> {
        let created: Customer = self
            .client
            .post_form("customers", &Self::customer_params(customer))
            .await?;

        info!("Created Stripe customer: id={}", created.id);
        Ok(created)
    }

    #[instrument(skip(self, subscription), fields(customer = %subscription.customer_id, items = subscription.price_ids.len()))]
    async fn create_subscription(&self, subscription: &NewSubscription) -> BillingResult<Subscription> {
        let created: Subscription = self
            .client
            .post_form("subscriptions", &Self::subscription_params(subscription))
            .await?;

        info!(
            "Created Stripe subscription: id={}, status={}, coupon={:?}",
            created.id, created.status, subscription.coupon
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn retrieve_subscription(&self, subscription_id: &str) -> BillingResult<Subscription> {
        if !is_object_id(subscription_id) {
            return Err(BillingError::InvalidRequest(format!(
                "Invalid subscription id: {:?}",
                subscription_id
            )));
        }

        self.client.get_resource("subscriptions", subscription_id).await
    }

    #[instrument(skip(self), fields(keys = lookup_keys.len()))]
    async fn list_prices(&self, lookup_keys: &[String]) -> BillingResult<Vec<Plan>> {
        let list: StripeList<StripePrice> = self
            .client
            .get("prices", &Self::price_query(lookup_keys))
            .await?;

        let mut plans: Vec<Plan> = list.data.into_iter().filter_map(StripePrice::into_plan).collect();

        // Stripe does not preserve lookup key order
        plans.sort_by_key(|plan| {
            plan.lookup_key
                .as_ref()
                .and_then(|key| lookup_keys.iter().position(|k| k == key))
                .unwrap_or(usize::MAX)
        });

        if plans.len() < lookup_keys.len() {
            warn!(
                "Stripe returned {} prices for {} lookup keys",
                plans.len(),
                lookup_keys.len()
            );
        }

        Ok(plans)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

/// Stripe object ids are `prefix_` plus alphanumerics
fn is_object_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
    #[serde(default)]
    unit_amount: Option<i64>,
    currency: String,
    #[serde(default)]
    lookup_key: Option<String>,
    product: ProductRef,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductRef {
    Expanded(StripeProduct),
    Id(String),
}

#[derive(Debug, Deserialize)]
struct StripeProduct {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl StripePrice {
    /// `None` for prices a plan cannot represent: tiered prices without a
    /// flat `unit_amount`, or currencies we cannot display.
    fn into_plan(self) -> Option<Plan> {
        let Some(unit_amount) = self.unit_amount else {
            warn!("Skipping price {}: no unit_amount (tiered or custom pricing)", self.id);
            return None;
        };
        let Some(currency) = Currency::from_code(&self.currency) else {
            warn!("Skipping price {}: unsupported currency {}", self.id, self.currency);
            return None;
        };

        let (title, emoji, image) = match self.product {
            ProductRef::Expanded(mut product) => {
                let title = product
                    .metadata
                    .remove("title")
                    .unwrap_or_else(|| product.name.clone());
                (
                    title,
                    product.metadata.remove("emoji"),
                    product.images.into_iter().next(),
                )
            }
            ProductRef::Id(product_id) => (product_id, None, None),
        };

        let mut plan = Plan::new(self.id, title, unit_amount);
        plan.currency = currency;
        plan.emoji = emoji;
        if let Some(image) = image {
            plan = plan.with_image(image);
        }
        if let Some(key) = self.lookup_key {
            plan = plan.with_lookup_key(key);
        }
        Some(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn billing(server: &MockServer) -> StripeBilling {
        let config = StripeConfig::new("sk_test_abc", "pk_test_xyz").with_api_base_url(server.uri());
        StripeBilling::new(config).unwrap()
    }

    fn form_body(server_requests: &[wiremock::Request], idx: usize) -> String {
        String::from_utf8(server_requests[idx].body.clone()).unwrap()
    }

    #[test]
    fn test_subscription_params() {
        let sub = NewSubscription::new("cus_1", vec!["price_a".into(), "price_b".into()])
            .with_coupon(Some("MULTI"));
        let params = StripeBilling::subscription_params(&sub);

        assert!(params.contains(&("customer".into(), "cus_1".into())));
        assert!(params.contains(&("items[0][price]".into(), "price_a".into())));
        assert!(params.contains(&("items[1][price]".into(), "price_b".into())));
        assert!(params.contains(&("discounts[0][coupon]".into(), "MULTI".into())));
        assert!(params.contains(&("expand[]".into(), "latest_invoice.payment_intent".into())));
    }

    #[test]
    fn test_subscription_params_without_coupon() {
        let sub = NewSubscription::new("cus_1", vec!["price_a".into()]);
        let params = StripeBilling::subscription_params(&sub);
        assert!(params.iter().all(|(k, _)| !k.starts_with("discounts")));
    }

    #[tokio::test]
    async fn test_create_customer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(header("authorization", "Bearer sk_test_abc"))
            .and(header_exists("idempotency-key"))
            .and(body_string_contains("payment_method=pm_card_visa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cus_123",
                "object": "customer",
                "email": "jenny@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let customer = billing(&server)
            .await
            .create_customer(&NewCustomer::new("jenny@example.com", "pm_card_visa"))
            .await
            .unwrap();

        assert_eq!(customer.id, "cus_123");
        assert_eq!(customer.email.as_deref(), Some("jenny@example.com"));
        assert_eq!(customer.extra["object"], "customer");
    }

    #[tokio::test]
    async fn test_create_subscription_sends_coupon() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/subscriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sub_1",
                "status": "active",
                "latest_invoice": {"payment_intent": {"status": "succeeded"}}
            })))
            .mount(&server)
            .await;

        let sub = NewSubscription::new("cus_1", vec!["price_a".into(), "price_b".into()])
            .with_coupon(Some("MULTI"));
        let created = billing(&server).await.create_subscription(&sub).await.unwrap();
        assert_eq!(created.id, "sub_1");
        assert!(!created.requires_action());

        let requests = server.received_requests().await.unwrap();
        let body = form_body(&requests, 0);
        assert!(body.contains("customer=cus_1"));
        assert!(body.contains("coupon%5D=MULTI"));
        assert!(body.contains("latest_invoice.payment_intent"));
    }

    #[tokio::test]
    async fn test_provider_error_is_forwarded() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "type": "card_error",
                    "code": "card_declined",
                    "message": "Your card was declined."
                }
            })))
            .mount(&server)
            .await;

        let err = billing(&server)
            .await
            .create_customer(&NewCustomer::new("a@b.c", "pm_card_chargeDeclined"))
            .await
            .unwrap_err();

        match err {
            BillingError::Provider { status, ref message } => {
                assert_eq!(status, Some(402));
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retrieve_subscription() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/subscriptions/sub_42"))
            .and(header("stripe-version", "2024-12-18.acacia"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sub_42",
                "status": "active"
            })))
            .mount(&server)
            .await;

        let sub = billing(&server).await.retrieve_subscription("sub_42").await.unwrap();
        assert_eq!(sub.status, "active");
    }

    #[tokio::test]
    async fn test_retrieve_subscription_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/subscriptions/sub_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"type": "invalid_request_error", "message": "No such subscription: 'sub_missing'"}
            })))
            .mount(&server)
            .await;

        let err = billing(&server)
            .await
            .retrieve_subscription("sub_missing")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(err.to_string().contains("No such subscription"));
    }

    #[tokio::test]
    async fn test_retrieve_rejects_path_like_ids() {
        let server = MockServer::start().await;
        let stripe = billing(&server).await;

        for id in [
            "",
            "../customers",
            "sub_1?expand[]=customer.invoice_settings.default_payment_method",
            "sub_1#fragment",
            "sub_1&expand[]=customer",
        ] {
            let err = stripe.retrieve_subscription(id).await.unwrap_err();
            assert!(matches!(err, BillingError::InvalidRequest(_)), "{id:?} accepted");
        }

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_prices() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/prices"))
            .and(query_param("expand[]", "data.product"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {
                        "id": "price_pasha",
                        "unit_amount": 500,
                        "currency": "usd",
                        "lookup_key": "pasha-monthly-usd",
                        "product": {"name": "Pasha", "images": [], "metadata": {"emoji": "🐈"}}
                    },
                    {
                        "id": "price_bremen",
                        "unit_amount": 700,
                        "currency": "usd",
                        "lookup_key": "bremen-monthly-usd",
                        "product": {"name": "prod", "metadata": {"title": "Bremen", "emoji": "🐓"}}
                    }
                ]
            })))
            .mount(&server)
            .await;

        let keys = vec!["bremen-monthly-usd".to_string(), "pasha-monthly-usd".to_string()];
        let plans = billing(&server).await.list_prices(&keys).await.unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, "price_bremen");
        assert_eq!(plans[0].title, "Bremen");
        assert_eq!(plans[0].emoji.as_deref(), Some("🐓"));
        assert_eq!(plans[1].title, "Pasha");
        assert_eq!(plans[1].unit_amount, 500);
    }

    #[tokio::test]
    async fn test_list_prices_skips_unrepresentable_prices() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/prices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {
                        "id": "price_swiss",
                        "unit_amount": 500,
                        "currency": "chf",
                        "lookup_key": "swiss-monthly",
                        "product": {"name": "Swiss"}
                    },
                    {
                        "id": "price_tiered",
                        "unit_amount": null,
                        "currency": "usd",
                        "lookup_key": "tiered-monthly",
                        "product": "prod_tiered"
                    },
                    {
                        "id": "price_lulu",
                        "unit_amount": 900,
                        "currency": "eur",
                        "lookup_key": "lulu-monthly",
                        "product": {"name": "Lulu", "images": ["https://img.example/lulu.png"]}
                    }
                ]
            })))
            .mount(&server)
            .await;

        let keys = vec![
            "swiss-monthly".to_string(),
            "tiered-monthly".to_string(),
            "lulu-monthly".to_string(),
        ];
        let plans = billing(&server).await.list_prices(&keys).await.unwrap();

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, "price_lulu");
        assert_eq!(plans[0].currency, Currency::EUR);
        assert_eq!(plans[0].image_url.as_deref(), Some("https://img.example/lulu.png"));
        assert_eq!(plans[0].lookup_key.as_deref(), Some("lulu-monthly"));
    }

    #[tokio::test]
    async fn test_network_error() {
        let config = StripeConfig::new("sk_test_abc", "pk_test_xyz").with_api_base_url("http://127.0.0.1:1");
        let err = StripeBilling::new(config)
            .unwrap()
            .retrieve_subscription("sub_1")
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Network(_)));
    }
}
