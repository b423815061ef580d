//! Talk-script hint endpoint
//!
//! GET /api/script-hint?customer_id=N

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use callwise_core::{script_hint, CustomerId};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};

#[derive(Debug, Deserialize)]
pub struct HintQuery {
    #[serde(default)]
    pub customer_id: CustomerId,
}

#[derive(Debug, Serialize)]
pub struct HintResponse {
    pub hint: &'static str,
}

/// Create hint routes
pub fn hints_routes() -> Router<ApiState> {
    Router::new().route("/api/script-hint", get(get_script_hint))
}

async fn get_script_hint(
    query: Result<Query<HintQuery>, QueryRejection>,
) -> Result<Json<HintResponse>, ApiError> {
    let Query(query) = query?;
    Ok(Json(HintResponse {
        hint: script_hint(query.customer_id),
    }))
}
