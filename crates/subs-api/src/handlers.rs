//! # Request Handlers
//!
//! Axum request handlers. Each one parses the request, makes one or two
//! provider calls and shapes the JSON response.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use subs_core::{BillingError, NewCustomer, NewSubscription, Plan, Subscription};
use subs_stripe::{dispatch_webhook_event, LoggingWebhookHandler};
use tracing::{debug, error, info, instrument, warn, Span};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create customer + subscription request
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    /// Payment method token created by the browser
    pub payment_method: String,
    pub email: String,
    /// Selected price ids
    #[serde(alias = "plan_ids")]
    pub price_ids: Vec<String>,
}

/// Subscription lookup request
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "subscriptionId", alias = "subscription_id")]
    pub subscription_id: String,
}

/// Data the browser needs to render the plan picker
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    pub public_key: String,
    pub min_products_for_discount: usize,
    pub discount_factor: f64,
    pub plans: Vec<Plan>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn billing_error_to_response(err: BillingError) -> ApiError {
    let code = err.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = ErrorResponse::new(err.to_string(), code);
    if let BillingError::UnknownPrice { price_id } = &err {
        response = response.with_details(format!("price_id={}", price_id));
    }
    (status, Json(response))
}

/// Provider failures are errors; our own rejections are warnings
fn log_failure(action: &str, err: &BillingError) {
    if err.is_provider_error() {
        error!("Failed to {}: {}", action, err);
    } else {
        warn!("Could not {}: {}", action, err);
    }
}

/// Malformed, incomplete or non-JSON request bodies
fn bad_request_body(rejection: JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(
            ErrorResponse::new("Invalid request body", StatusCode::BAD_REQUEST.as_u16())
                .with_details(rejection.body_text()),
        ),
    )
}

/// Lookups the browser makes after payment answer 403 on any provider failure
fn forbidden(err: BillingError) -> ApiError {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse::new(err.to_string(), StatusCode::FORBIDDEN.as_u16())),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "subs-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Landing page
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let path = state.config.static_dir.join("index.html");
    tokio::fs::read_to_string(&path).await.map(Html).map_err(|e| {
        warn!("Cannot read {}: {}", path.display(), e);
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Landing page not found", 404)),
        )
    })
}

/// Publishable key, discount settings and the plan list
#[instrument(skip(state))]
pub async fn bootstrap(State(state): State<AppState>) -> Result<Json<BootstrapResponse>, ApiError> {
    let plans = match &state.live_lookup_keys {
        Some(keys) => state.provider.list_prices(keys).await.map_err(|e| {
            log_failure("list prices", &e);
            forbidden(e)
        })?,
        None => state.catalog.active_plans().cloned().collect(),
    };

    Ok(Json(BootstrapResponse {
        public_key: state.publishable_key.clone(),
        min_products_for_discount: state.discount.min_items_for_discount,
        discount_factor: state.discount.discount_factor,
        plans,
    }))
}

/// Create a customer and subscribe them to the selected plans
#[instrument(skip_all, fields(items = tracing::field::Empty))]
pub async fn create_customer(
    State(state): State<AppState>,
    request: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<Json<Subscription>, ApiError> {
    let Json(request) = request.map_err(bad_request_body)?;
    Span::current().record("items", request.price_ids.len());

    if request.email.trim().is_empty() || request.payment_method.trim().is_empty() {
        return Err(billing_error_to_response(BillingError::InvalidRequest(
            "email and payment_method are required".to_string(),
        )));
    }

    // Validate before touching the provider
    let selected = state
        .catalog
        .validate_selection(&request.price_ids)
        .map_err(|e| {
            warn!("Rejected plan selection: {}", e);
            billing_error_to_response(e)
        })?;
    for plan in &selected {
        debug!("Selected {} ({}) at {}/month", plan.title, plan.id, plan.display_price());
    }
    let amounts: Vec<i64> = selected.iter().map(|plan| plan.unit_amount).collect();

    let coupon = state.discount.coupon_for(request.price_ids.len());

    info!(
        "Creating subscription: {} plans, expected monthly total={}, coupon={:?}",
        amounts.len(),
        state.discount.discounted_total(&amounts),
        coupon
    );

    let customer = state
        .provider
        .create_customer(&NewCustomer::new(&request.email, &request.payment_method))
        .await
        .map_err(|e| {
            log_failure("create customer", &e);
            billing_error_to_response(e)
        })?;

    let subscription = state
        .provider
        .create_subscription(
            &NewSubscription::new(customer.id, request.price_ids).with_coupon(coupon),
        )
        .await
        .map_err(|e| {
            log_failure("create subscription", &e);
            billing_error_to_response(e)
        })?;

    if subscription.requires_action() {
        info!(
            "Subscription {} needs customer authentication before activation (client secret present: {})",
            subscription.id,
            subscription.client_secret().is_some()
        );
    } else {
        info!(
            "Created subscription {}: status={}",
            subscription.id, subscription.status
        );
    }

    Ok(Json(subscription))
}

/// Retrieve a subscription
#[instrument(skip_all, fields(subscription_id = tracing::field::Empty))]
pub async fn get_subscription(
    State(state): State<AppState>,
    request: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<Json<Subscription>, ApiError> {
    let Json(request) = request.map_err(bad_request_body)?;
    Span::current().record("subscription_id", request.subscription_id.as_str());

    state
        .provider
        .retrieve_subscription(&request.subscription_id)
        .await
        .map(Json)
        .map_err(|e| {
            log_failure("retrieve subscription", &e);
            forbidden(e)
        })
}

/// Handle provider webhook
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    let event = state
        .webhooks
        .construct_event(&body, signature)
        .map_err(|e| {
            warn!("Webhook rejected: {}", e);
            billing_error_to_response(e)
        })?;

    info!(
        "Received webhook: type={}, id={}, verified={}",
        event.event_type, event.event_id, event.verified
    );

    dispatch_webhook_event(&LoggingWebhookHandler, &event).map_err(|e| {
        error!("Webhook handler error: {}", e);
        billing_error_to_response(e)
    })?;

    Ok(Json(serde_json::json!({ "status": "success" })))
}
