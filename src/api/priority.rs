//! Priority list endpoint
//!
//! GET /api/priority-list - Customers ranked by call priority

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use callwise_core::{rank_with_policy, ScoredCustomer};
use tracing::debug;

use super::{ApiError, ApiState};

/// Create priority routes
pub fn priority_routes() -> Router<ApiState> {
    Router::new().route("/api/priority-list", get(priority_list))
}

/// Every customer scored against today's local date, highest first
pub async fn priority_list(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ScoredCustomer>>, ApiError> {
    let snapshot = state.store.priority_snapshot().await?;
    let today = chrono::Local::now().date_naive();
    let ranked = rank_with_policy(
        &snapshot.customers,
        &snapshot.latest_contact,
        today,
        &state.scoring,
    );
    debug!(customers = ranked.len(), "priority list computed");
    Ok(Json(ranked))
}
