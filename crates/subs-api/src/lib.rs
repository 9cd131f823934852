//! # subs-api
//!
//! HTTP API layer for the multi-plan subscription backend.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Customer and subscription creation with the multi-plan coupon
//! - Webhook handler for subscription lifecycle events
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Landing page |
//! | GET | `/bootstrap` | Publishable key, discount settings, plans |
//! | GET | `/setup-page` | Alias of `/bootstrap` |
//! | POST | `/create-customer` | Create customer and subscription |
//! | POST | `/subscription` | Retrieve subscription |
//! | POST | `/webhook` | Stripe webhook |
//! | GET | `/health` | Health check |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, CatalogSource};
