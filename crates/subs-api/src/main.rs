//! # subs-server
//!
//! Subscription billing backend for a multi-plan storefront.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (or put them in .env)
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export COUPON_ID=...
//! export PLANS_FILE_LOCATION=config/plans.json
//!
//! # Run the server
//! subs-server
//! ```

use subs_api::{routes, state::AppState};
use subs_stripe::SUBSCRIBED_WEBHOOK_EVENTS;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::from_env().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Billing provider: {}", state.provider.provider_name());
    info!(
        "Plans loaded: {}{}",
        state.catalog.len(),
        if state.live_lookup_keys.is_some() { " (live prices)" } else { "" }
    );
    match &state.discount.coupon_id {
        Some(coupon) => info!(
            "Coupon {} applies from {} plans",
            coupon, state.discount.min_items_for_discount
        ),
        None => info!("No COUPON_ID set, multi-plan discount disabled"),
    }

    let app = routes::create_router(state);

    info!("🚀 subs-server listening on http://{}", addr);

    if !is_prod {
        info!("🧾 Bootstrap: GET http://{}/bootstrap", addr);
        info!("💳 Subscribe: POST http://{}/create-customer", addr);
        info!("🔔 Webhook: POST http://{}/webhook", addr);
        info!("   Events: {}", SUBSCRIBED_WEBHOOK_EVENTS.join(", "));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  subs-server
  ━━━━━━━━━━━━━━━━━━━━━━━
  Multi-plan subscriptions
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
