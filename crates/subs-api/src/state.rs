//! # Application State
//!
//! Shared, read-only state for the Axum application: billing provider,
//! plan catalog, discount policy and webhook verifier. Everything is loaded
//! once from the environment at startup.

use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use subs_core::discount::{DEFAULT_DISCOUNT_FACTOR, DEFAULT_MIN_ITEMS_FOR_DISCOUNT};
use subs_core::{BillingProvider, BoxedBillingProvider, DiscountPolicy, PlanCatalog};
use subs_stripe::{StripeBilling, WebhookVerifier};
use tracing::info;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Directory holding `index.html` and client assets
    pub static_dir: PathBuf,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var(&var, "PORT", defaults.port)?,
            environment: var("ENVIRONMENT").unwrap_or(defaults.environment),
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4242,
            environment: "development".to_string(),
            static_dir: PathBuf::from("client"),
        }
    }
}

/// Where the plan catalog comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// JSON or TOML file (`PLANS_FILE_LOCATION`)
    File(PathBuf),
    /// Inline JSON (`PLANS_JSON`)
    Inline(String),
    /// Prices resolved live from the provider by lookup key
    /// (`PRICE_LOOKUP_KEYS`, or `ANIMALS` as `<animal>-monthly-usd`)
    LookupKeys(Vec<String>),
}

impl CatalogSource {
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(path) = var("PLANS_FILE_LOCATION") {
            return Ok(CatalogSource::File(PathBuf::from(path)));
        }
        if let Some(json) = var("PLANS_JSON") {
            return Ok(CatalogSource::Inline(json));
        }
        if let Some(keys) = var("PRICE_LOOKUP_KEYS") {
            return Ok(CatalogSource::LookupKeys(split_list(&keys, |k| k.to_string())));
        }
        if let Some(animals) = var("ANIMALS") {
            return Ok(CatalogSource::LookupKeys(split_list(&animals, |a| {
                format!("{}-monthly-usd", a)
            })));
        }

        bail!("No plan catalog configured: set PLANS_FILE_LOCATION, PLANS_JSON, PRICE_LOOKUP_KEYS or ANIMALS")
    }

    /// Resolve into a catalog. Lookup keys cost one provider call.
    pub async fn load(&self, provider: &dyn BillingProvider) -> anyhow::Result<PlanCatalog> {
        let catalog = match self {
            CatalogSource::File(path) => load_catalog_file(path)?,
            CatalogSource::Inline(json) => {
                PlanCatalog::from_json(json).context("Failed to parse PLANS_JSON")?
            }
            CatalogSource::LookupKeys(keys) => PlanCatalog::from_plans(
                provider
                    .list_prices(keys)
                    .await
                    .context("Failed to fetch prices from provider")?,
            ),
        };

        if catalog.is_empty() {
            bail!("Plan catalog is empty ({:?})", self);
        }

        Ok(catalog)
    }
}

fn split_list(raw: &str, map: impl Fn(&str) -> String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(map)
        .collect()
}

/// Load catalog from a `.toml` or JSON file
pub fn load_catalog_file(path: &Path) -> anyhow::Result<PlanCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan catalog {}", path.display()))?;

    let catalog = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => PlanCatalog::from_toml(&content),
        _ => PlanCatalog::from_json(&content),
    }
    .with_context(|| format!("Failed to parse {}", path.display()))?;

    info!("Loaded {} plans from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Discount policy from `COUPON_ID`, `MIN_PRODUCTS_FOR_DISCOUNT`
/// (or `MIN_PLANS_FOR_DISCOUNT`) and `DISCOUNT_FACTOR`
pub fn discount_policy_from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<DiscountPolicy> {
    let coupon_id = var("COUPON_ID").filter(|c| !c.trim().is_empty());

    let min_items = match var("MIN_PRODUCTS_FOR_DISCOUNT") {
        Some(_) => parse_var(&var, "MIN_PRODUCTS_FOR_DISCOUNT", DEFAULT_MIN_ITEMS_FOR_DISCOUNT)?,
        None => parse_var(&var, "MIN_PLANS_FOR_DISCOUNT", DEFAULT_MIN_ITEMS_FOR_DISCOUNT)?,
    };

    let factor: f64 = parse_var(&var, "DISCOUNT_FACTOR", DEFAULT_DISCOUNT_FACTOR)?;
    if !(0.0..=1.0).contains(&factor) {
        bail!("DISCOUNT_FACTOR must be between 0 and 1, got {}", factor);
    }

    Ok(DiscountPolicy::new(coupon_id, min_items).with_discount_factor(factor))
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Billing provider
    pub provider: BoxedBillingProvider,
    /// Plan catalog snapshot used to validate client selections
    pub catalog: Arc<PlanCatalog>,
    /// When set, the bootstrap endpoint lists prices live from the provider.
    /// Selections are still validated against `catalog`, the startup
    /// snapshot, so prices added later are rejected until a restart.
    pub live_lookup_keys: Option<Arc<Vec<String>>>,
    /// Multi-plan coupon rule
    pub discount: Arc<DiscountPolicy>,
    /// Webhook signature verifier
    pub webhooks: WebhookVerifier,
    /// Publishable key for the browser
    pub publishable_key: String,
    /// Application config
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create state with defaults around a provider and catalog
    pub fn new(provider: BoxedBillingProvider, catalog: PlanCatalog, config: AppConfig) -> Self {
        Self {
            provider,
            catalog: Arc::new(catalog),
            live_lookup_keys: None,
            discount: Arc::new(DiscountPolicy::default()),
            webhooks: WebhookVerifier::new(None),
            publishable_key: String::new(),
            config: Arc::new(config),
        }
    }

    /// Build the Stripe-backed state from the environment
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let var = |name: &str| std::env::var(name).ok();

        let stripe = StripeBilling::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        let publishable_key = stripe.config().publishable_key.clone();
        let webhooks = WebhookVerifier::from_config(stripe.config());
        if !webhooks.is_enforced() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, webhook signatures will not be verified");
        }
        let provider: BoxedBillingProvider = Arc::new(stripe);

        let discount = discount_policy_from_vars(var)?;
        let source = CatalogSource::from_vars(var)?;
        let catalog = source.load(provider.as_ref()).await?;

        let mut state = Self::new(provider, catalog, config)
            .with_discount(discount)
            .with_webhook_verifier(webhooks)
            .with_publishable_key(publishable_key);
        if let CatalogSource::LookupKeys(keys) = source {
            state = state.with_live_lookup_keys(keys);
        }

        Ok(state)
    }

    /// Builder: set discount policy
    pub fn with_discount(mut self, discount: DiscountPolicy) -> Self {
        self.discount = Arc::new(discount);
        self
    }

    /// Builder: set webhook verifier
    pub fn with_webhook_verifier(mut self, webhooks: WebhookVerifier) -> Self {
        self.webhooks = webhooks;
        self
    }

    /// Builder: set publishable key
    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = key.into();
        self
    }

    /// Builder: fetch plans live on bootstrap
    pub fn with_live_lookup_keys(mut self, keys: Vec<String>) -> Self {
        self.live_lookup_keys = Some(Arc::new(keys));
        self
    }
}
