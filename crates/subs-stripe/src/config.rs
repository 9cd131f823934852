//! # Stripe Configuration
//!
//! Configuration management for Stripe integration.
//! All secrets are loaded from environment variables.

use std::env;
use subs_core::BillingError;

pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
pub const DEFAULT_API_VERSION: &str = "2024-12-18.acacia";

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_..., sk_live_... or restricted rk_...)
    pub secret_key: String,

    /// Publishable key handed to the browser (pk_test_... or pk_live_...)
    pub publishable_key: String,

    /// Webhook signing secret (whsec_...). Signatures are only enforced
    /// when this is set.
    pub webhook_secret: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version sent as `Stripe-Version`
    pub api_version: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    /// - `STRIPE_PUBLISHABLE_KEY` (or `STRIPE_PUBLIC_KEY`)
    ///
    /// Optional: `STRIPE_WEBHOOK_SECRET`, `STRIPE_API_VERSION`, `STRIPE_API_BASE`
    pub fn from_env() -> Result<Self, BillingError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret_key = env::var("STRIPE_SECRET_KEY").map_err(|_| {
            BillingError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        let publishable_key = env::var("STRIPE_PUBLISHABLE_KEY")
            .or_else(|_| env::var("STRIPE_PUBLIC_KEY"))
            .map_err(|_| {
                BillingError::Configuration("STRIPE_PUBLISHABLE_KEY not set".to_string())
            })?;

        let webhook_secret = non_empty_var("STRIPE_WEBHOOK_SECRET");

        let config = Self {
            secret_key,
            publishable_key,
            webhook_secret,
            api_base_url: non_empty_var("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_version: non_empty_var("STRIPE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        };
        config.validate()?;

        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
            webhook_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Validate key formats
    pub fn validate(&self) -> Result<(), BillingError> {
        if !["sk_test_", "sk_live_", "rk_test_", "rk_live_"]
            .iter()
            .any(|p| self.secret_key.starts_with(p))
        {
            return Err(BillingError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_, sk_live_ or rk_".to_string(),
            ));
        }

        if !self.publishable_key.starts_with("pk_test_")
            && !self.publishable_key.starts_with("pk_live_")
        {
            return Err(BillingError::Configuration(
                "STRIPE_PUBLISHABLE_KEY must start with pk_test_ or pk_live_".to_string(),
            ));
        }

        if let Some(secret) = &self.webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(BillingError::Configuration(
                    "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.contains("_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set webhook signing secret
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Builder: set API version
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = StripeConfig::new("sk_test_abc123", "pk_test_xyz789");
        assert!(config.validate().is_ok());
        assert!(config.is_test_mode());

        let config = StripeConfig::new("sk_live_abc123", "pk_live_xyz789");
        assert!(config.validate().is_ok());
        assert!(!config.is_test_mode());

        let restricted = StripeConfig::new("rk_test_abc", "pk_test_xyz");
        assert!(restricted.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_keys() {
        assert!(StripeConfig::new("pk_test_wrong", "pk_test_xyz").validate().is_err());
        assert!(StripeConfig::new("sk_test_abc", "sk_test_xyz").validate().is_err());
        assert!(StripeConfig::new("sk_test_abc", "pk_test_xyz")
            .with_webhook_secret("not_a_secret")
            .validate()
            .is_err());
    }

    #[test]
    fn test_auth_header() {
        let config = StripeConfig::new("sk_test_abc123", "pk_test_xyz789");
        assert_eq!(config.auth_header(), "Bearer sk_test_abc123");
    }

    #[test]
    fn test_builders() {
        let config = StripeConfig::new("sk_test_abc", "pk_test_xyz")
            .with_api_base_url("http://127.0.0.1:9999")
            .with_api_version("2020-08-27")
            .with_webhook_secret("whsec_123");

        assert_eq!(config.api_base_url, "http://127.0.0.1:9999");
        assert_eq!(config.api_version, "2020-08-27");
        assert_eq!(config.webhook_secret.as_deref(), Some("whsec_123"));
    }
}
