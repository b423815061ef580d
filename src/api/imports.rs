//! Data entry endpoints
//!
//! POST /api/import/manual - Single customer (form-encoded)
//! POST /api/import/csv    - Bulk upload (multipart `file`)
//! POST /api/import/card   - Business card capture (form-encoded)

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Form, Json, Router};
use callwise_core::import::ensure_csv_filename;
use callwise_core::{
    non_empty, parse_customers_csv, parse_date, ContactMethod, NewBusinessCard, NewCustomer,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ApiError, ApiState};

/// Create data entry routes
pub fn imports_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/import/manual", post(import_manual))
        .route("/api/import/csv", post(import_csv))
        .route("/api/import/card", post(import_card))
}

/// Manual entry form; every field arrives as text
#[derive(Debug, Deserialize)]
pub struct ManualEntryForm {
    pub customer_name: String,
    pub company_name: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub total_purchase: String,
    #[serde(default)]
    pub last_purchase_date: String,
}

/// Business card form
#[derive(Debug, Deserialize)]
pub struct CardForm {
    pub company_name: String,
    pub personal_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub address: String,
}

fn required(name: &str, value: String) -> Result<String, ApiError> {
    non_empty(value).ok_or_else(|| ApiError::bad_request(format!("{} is required", name)))
}

async fn import_manual(
    State(state): State<ApiState>,
    form: Result<Form<ManualEntryForm>, FormRejection>,
) -> Result<Json<Value>, ApiError> {
    let Form(form) = form?;

    let total_purchase = match non_empty(form.total_purchase) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| ApiError::bad_request(format!("invalid total_purchase '{}'", raw)))?,
        None => 0.0,
    };
    let last_purchase_date = non_empty(form.last_purchase_date)
        .map(|raw| parse_date(&raw))
        .transpose()?;

    let customer = NewCustomer::new(
        required("customer_name", form.customer_name)?,
        required("company_name", form.company_name)?,
    )
    .with_contact(form.contact_number, form.email, form.address)
    .with_purchase(total_purchase, last_purchase_date)
    .with_method(ContactMethod::Manual);

    let customer = state.store.create_customer(customer).await?;
    info!(customer_id = customer.customer_id, "customer added manually");
    Ok(Json(json!({ "success": true, "customer_id": customer.customer_id })))
}

async fn import_csv(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            upload = Some((file_name, field.bytes().await?));
            break;
        }
    }
    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::bad_request("no file uploaded"));
    };

    ensure_csv_filename(&file_name)?;
    let batch = parse_customers_csv(&bytes)?;
    let duplicates_in_file = batch.skipped;
    let outcome = state.store.import_customers(batch.rows).await?;
    let skipped = duplicates_in_file + outcome.skipped;

    info!(
        file = %file_name,
        imported = outcome.imported,
        skipped,
        "CSV import finished"
    );
    Ok(Json(json!({
        "success": true,
        "imported": outcome.imported,
        "skipped": skipped
    })))
}

async fn import_card(
    State(state): State<ApiState>,
    form: Result<Form<CardForm>, FormRejection>,
) -> Result<Json<Value>, ApiError> {
    let Form(form) = form?;

    let card = NewBusinessCard {
        company_name: required("company_name", form.company_name)?,
        personal_name: required("personal_name", form.personal_name)?,
        email: non_empty(form.email),
        contact_number: non_empty(form.contact_number),
        address: non_empty(form.address),
    };

    let registered = state.store.register_card(card).await?;
    info!(
        customer_id = registered.customer_id,
        card_id = registered.card_id,
        created_customer = registered.created_customer,
        "business card registered"
    );
    Ok(Json(json!({ "success": true, "customer_id": registered.customer_id })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{self, get, post_form, send};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};

    const BOUNDARY: &str = "callwise-test-boundary";

    fn upload(file_name: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/import/csv")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_manual_entry() {
        let app = test_support::app(test_support::state().await);

        let (status, body) = send(
            app.clone(),
            post_form(
                "/api/import/manual",
                "customer_name=Tanaka&company_name=Tanaka+Steel&email=t%40example.com&total_purchase=&last_purchase_date=2025-12-01",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let id = body["customer_id"].as_i64().unwrap();

        let (_, detail) = send(app, get(&format!("/api/customer/{}", id))).await;
        assert_eq!(detail["company_name"], "Tanaka Steel");
        assert_eq!(detail["total_purchase"], 0.0);
        assert_eq!(detail["last_purchase_date"], "2025-12-01");
        assert_eq!(detail["last_contact_method"], "Manual entry");
    }

    #[tokio::test]
    async fn test_manual_entry_rejects_bad_values() {
        let app = test_support::app(test_support::state().await);

        for body in [
            "customer_name=A&company_name=B&total_purchase=lots",
            "customer_name=A&company_name=B&last_purchase_date=2025%2F12%2F01",
            "customer_name=A&company_name=+",
            "customer_name=A",
        ] {
            let (status, _) = send(app.clone(), post_form("/api/import/manual", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_csv_upload() {
        let state = test_support::state().await;
        state
            .store
            .create_customer(callwise_core::NewCustomer::new("Existing", "Kato Trading"))
            .await
            .unwrap();
        let app = test_support::app(state);

        let csv = "customer_name,company_name,total_purchase\n\
                   Mori,Mori Works,120000\n\
                   Kato,Kato Trading,5000\n\
                   Mori Jr,Mori Works,1\n";
        let (status, body) = send(app, upload("customers.csv", csv.as_bytes())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["imported"], 1);
        assert_eq!(body["skipped"], 2);
    }

    #[tokio::test]
    async fn test_csv_upload_rejections() {
        let app = test_support::app(test_support::state().await);

        let (status, body) = send(app.clone(), upload("customers.xlsx", b"a,b\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("CSV"));

        let (status, body) = send(app, upload("customers.csv", b"name,email\nA,a@x\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("company_name"));
    }

    #[tokio::test]
    async fn test_csv_upload_without_multipart_body() {
        let app = test_support::app(test_support::state().await);

        let (status, body) = send(app, post_form("/api/import/csv", "file=customers.csv")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_card_reuses_company() {
        let app = test_support::app(test_support::state().await);

        let (status, first) = send(
            app.clone(),
            post_form(
                "/api/import/card",
                "company_name=Abe+Print&personal_name=Abe&email=abe%40example.com",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, second) = send(
            app.clone(),
            post_form("/api/import/card", "company_name=Abe+Print&personal_name=Ueda"),
        )
        .await;
        assert_eq!(first["customer_id"], second["customer_id"]);

        let (status, _) = send(app, post_form("/api/import/card", "company_name=Abe+Print")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
