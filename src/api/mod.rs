//! Web API module for Callwise
//!
//! Provides REST API endpoints for:
//! - The call priority list
//! - Customer detail and call logging
//! - Manual, CSV and business-card data entry
//! - Talk-script hints

pub mod customers;
pub mod error;
pub mod health;
pub mod hints;
pub mod imports;
pub mod priority;

use axum::Router;
use callwise_core::ScoringPolicy;
use callwise_store::CustomerStore;

pub use customers::customers_routes;
pub use error::ApiError;
pub use health::health_routes;
pub use hints::hints_routes;
pub use imports::imports_routes;
pub use priority::priority_routes;

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub store: CustomerStore,
    pub scoring: ScoringPolicy,
}

impl ApiState {
    pub fn new(store: CustomerStore, scoring: ScoringPolicy) -> Self {
        Self { store, scoring }
    }
}

/// Create the API router with all `/api` endpoints
pub fn api_router() -> Router<ApiState> {
    Router::new()
        .merge(priority_routes())
        .merge(customers_routes())
        .merge(imports_routes())
        .merge(hints_routes())
}
