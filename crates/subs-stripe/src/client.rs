//! # Stripe REST Client
//!
//! Thin transport over the Stripe API: auth and version headers,
//! form-encoded POST bodies, idempotency keys, error decoding.

use crate::config::StripeConfig;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use subs_core::{BillingError, BillingResult};
use tracing::{debug, error};
use uuid::Uuid;

/// Form or query parameters in Stripe's bracketed notation
pub type Params = Vec<(String, String)>;

pub struct StripeClient {
    config: StripeConfig,
    http: Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> BillingResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| BillingError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    /// POST a form body. Every call gets a fresh idempotency key so a
    /// transport-level resend cannot double-create.
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, params: &Params) -> BillingResult<T> {
        let request = self
            .http
            .post(self.url(path))
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(params);
        self.execute(request).await
    }

    /// URL of a single object. The id is percent-encoded as one path
    /// segment, so `?`, `#` and `/` cannot change the request.
    fn resource_url(&self, collection: &str, id: &str) -> BillingResult<Url> {
        let mut url = Url::parse(&self.url(collection)).map_err(|e| {
            BillingError::Configuration(format!("Invalid Stripe API base URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                BillingError::Configuration("Stripe API base URL cannot have a path".to_string())
            })?
            .push(id);
        Ok(url)
    }

    /// GET `/v1/{collection}/{id}`
    pub async fn get_resource<T: DeserializeOwned>(&self, collection: &str, id: &str) -> BillingResult<T> {
        let request = self.http.get(self.resource_url(collection, id)?);
        self.execute(request).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &Params) -> BillingResult<T> {
        let request = self.http.get(self.url(path)).query(query);
        self.execute(request).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> BillingResult<T> {
        let response = request
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| BillingError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BillingError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(decode_error(status.as_u16(), &body));
        }

        debug!("Stripe API response: status={}", status);

        serde_json::from_str(&body).map_err(|e| {
            BillingError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Turn a Stripe error body into a provider error, keeping Stripe's
/// human-readable message when there is one.
pub(crate) fn decode_error(status: u16, body: &str) -> BillingError {
    let message = serde_json::from_str::<StripeErrorResponse>(body)
        .ok()
        .and_then(|r| r.error.message)
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    BillingError::provider(Some(status), message)
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeApiError,
}

#[derive(Debug, Deserialize)]
struct StripeApiError {
    #[serde(default)]
    message: Option<String>,
}
