//! Customer endpoints
//!
//! GET  /api/customer/:id  - Customer detail with call history
//! POST /api/call-record   - Log a call (form-encoded)

use axum::extract::rejection::{FormRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use callwise_core::{parse_date, CallRecord, Customer, CustomerId, NewCallRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, ApiState};

const UNKNOWN_CUSTOMER: &str = "Unknown customer";

/// Create customer routes
pub fn customers_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/customer/:customer_id", get(get_customer_detail))
        .route("/api/call-record", post(add_call_record))
}

/// Customer detail; optional fields are rendered as empty strings
#[derive(Debug, Serialize, PartialEq)]
pub struct CustomerDetail {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub contact_number: String,
    pub email: String,
    pub address: String,
    pub company_name: String,
    pub last_purchase_date: String,
    pub total_purchase: f64,
    pub last_contact_method: String,
    pub call_history: Vec<CallHistoryEntry>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CallHistoryEntry {
    pub call_date: String,
    pub call_result: String,
    pub call_duration: String,
}

impl CustomerDetail {
    fn placeholder(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            customer_name: UNKNOWN_CUSTOMER.to_string(),
            contact_number: String::new(),
            email: String::new(),
            address: String::new(),
            company_name: String::new(),
            last_purchase_date: String::new(),
            total_purchase: 0.0,
            last_contact_method: String::new(),
            call_history: Vec::new(),
        }
    }

    fn from_parts(customer: Customer, history: Vec<CallRecord>) -> Self {
        Self {
            customer_id: customer.customer_id,
            customer_name: customer.customer_name,
            contact_number: customer.contact_number.unwrap_or_default(),
            email: customer.email.unwrap_or_default(),
            address: customer.address.unwrap_or_default(),
            company_name: customer.company_name,
            last_purchase_date: customer
                .last_purchase_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            total_purchase: customer.total_purchase,
            last_contact_method: customer.last_contact_method.unwrap_or_default(),
            call_history: history
                .into_iter()
                .map(|r| CallHistoryEntry {
                    call_date: r.call_date.format("%Y-%m-%d").to_string(),
                    call_result: r.call_result.unwrap_or_default(),
                    call_duration: r.call_duration.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

async fn get_customer_detail(
    State(state): State<ApiState>,
    path: Result<Path<CustomerId>, PathRejection>,
) -> Result<Json<CustomerDetail>, ApiError> {
    let Path(customer_id) = path?;
    let Some(customer) = state.store.get_customer(customer_id).await? else {
        return Ok(Json(CustomerDetail::placeholder(customer_id)));
    };
    let history = state.store.call_history(customer_id).await?;
    Ok(Json(CustomerDetail::from_parts(customer, history)))
}

/// Call log form
#[derive(Debug, Deserialize)]
pub struct CallRecordForm {
    pub customer_id: CustomerId,
    pub call_date: String,
    pub call_result: String,
    #[serde(default)]
    pub call_duration: String,
}

async fn add_call_record(
    State(state): State<ApiState>,
    form: Result<Form<CallRecordForm>, FormRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Form(form) = form?;

    let call_date = parse_date(&form.call_date)?;

    let record = state
        .store
        .add_call_record(NewCallRecord {
            customer_id: form.customer_id,
            call_date,
            call_result: form.call_result,
            call_duration: callwise_core::non_empty(form.call_duration),
        })
        .await?;

    info!(
        customer_id = record.customer_id,
        call_id = record.call_id,
        "call recorded"
    );
    Ok(Json(serde_json::json!({ "success": true })))
}
