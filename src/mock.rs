//! In-memory reference implementation of the partial-receiving endpoint.
//!
//! Serves the same wire contract the real backend does: flattened request
//! bodies in, `{ "data": <tree> }` responses out. Saves are upserts keyed by
//! shipment id. A completed payload flips the shipment to RECEIVED and
//! zeroes the remainder of every cancelled row. Used by the demo binary and
//! the integration tests; nothing here persists beyond process lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::client::CHECK_STEP_NUMBER;
use crate::models::{
    Container, EntityRef, PartialReceipt, Product, ReceiptStatus, ShipmentItem, ShipmentStatus,
};
use crate::wire;

pub struct MockReceivingState {
    receipts: Mutex<HashMap<String, PartialReceipt>>,
}

impl MockReceivingState {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            receipts: Mutex::new(HashMap::new()),
        })
    }

    /// State preloaded with one shipment ready to receive.
    pub async fn seeded() -> Arc<Self> {
        let state = Self::empty();
        state
            .receipts
            .lock()
            .await
            .insert("demo-shipment".to_string(), demo_receipt());
        state
    }
}

/// A representative receipt: two pack lines, one loose item, one row with a
/// missing bin location so the confirmation pause can be exercised.
pub fn demo_receipt() -> PartialReceipt {
    let item = |code: &str, name: &str, receiving: Decimal, remaining: Decimal| ShipmentItem {
        product: Product {
            product_code: code.to_string(),
            name: name.to_string(),
        },
        quantity_receiving: Some(receiving),
        quantity_remaining: remaining,
        ..Default::default()
    };

    PartialReceipt {
        origin: EntityRef::named("loc-central", "Central Warehouse"),
        destination: EntityRef::named("loc-clinic", "Eastside Clinic"),
        date_shipped: NaiveDate::from_ymd_opt(2024, 6, 3),
        date_delivered: NaiveDate::from_ymd_opt(2024, 6, 11),
        shipment_status: ShipmentStatus::Shipped,
        receipt_status: Some(ReceiptStatus::Pending),
        requisition: Some("DEMO-001".to_string()),
        shipment_id: Some("demo-shipment".to_string()),
        containers: vec![
            Container {
                container_id: Some("pallet-1".to_string()),
                name: Some("Pallet 1".to_string()),
                shipment_items: vec![
                    ShipmentItem {
                        receipt_item_id: Some("ri-1".to_string()),
                        bin_location: Some(EntityRef::named("bin-a1", "A1-02-01")),
                        lot_number: Some("L-2024-18".to_string()),
                        expiration_date: NaiveDate::from_ymd_opt(2026, 1, 31),
                        ..item("10001", "Exam gloves, nitrile, medium", dec!(400), dec!(100))
                    },
                    ShipmentItem {
                        receipt_item_id: Some("ri-2".to_string()),
                        bin_location: Some(EntityRef::named("bin-a2", "A1-02-02")),
                        recipient: Some(EntityRef::named("person-9", "R. Alvarez")),
                        ..item("10043", "Syringe 5ml, luer lock", dec!(1200), dec!(0))
                    },
                ],
                ..Default::default()
            },
            Container {
                container_id: Some("loose-1".to_string()),
                shipment_items: vec![ShipmentItem {
                    receipt_item_id: Some("ri-3".to_string()),
                    comment: Some("Box dented, contents intact".to_string()),
                    ..item("20110", "Surgical masks, box of 50", dec!(24), dec!(6))
                }],
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

#[derive(Debug, Deserialize)]
pub struct StepQuery {
    #[serde(rename = "stepNumber")]
    step_number: Option<u8>,
}

fn error_body(message: &str) -> Json<Value> {
    Json(json!({ "errorMessage": message }))
}

/// What the backend does with a step-2 save before echoing it back.
fn apply_save(shipment_id: &str, mut receipt: PartialReceipt) -> PartialReceipt {
    if receipt.shipment_id.is_none() {
        receipt.shipment_id = Some(shipment_id.to_string());
    }

    if receipt.receipt_status == Some(ReceiptStatus::Completed) {
        receipt.shipment_status = ShipmentStatus::Received;
        for container in &mut receipt.containers {
            for item in &mut container.shipment_items {
                if item.cancel_remaining {
                    item.quantity_remaining = Decimal::ZERO;
                }
            }
        }
    }

    receipt
}

async fn get_receipt(
    State(state): State<Arc<MockReceivingState>>,
    Path(shipment_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let receipts = state.receipts.lock().await;
    let receipt = receipts.get(&shipment_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            error_body(&format!("no shipment with id {shipment_id}")),
        )
    })?;
    let tree = serde_json::to_value(receipt).map_err(internal_error)?;
    Ok(Json(json!({ "data": tree })))
}

async fn save_receipt(
    State(state): State<Arc<MockReceivingState>>,
    Path(shipment_id): Path<String>,
    Query(query): Query<StepQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if query.step_number != Some(CHECK_STEP_NUMBER) {
        return Err((
            StatusCode::BAD_REQUEST,
            error_body("only stepNumber=2 is supported"),
        ));
    }

    let receipt: PartialReceipt = serde_json::from_value(wire::expand(&body)).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            error_body(&format!("malformed receipt payload: {e}")),
        )
    })?;

    let saved = apply_save(&shipment_id, receipt);
    info!(
        shipment_id,
        items = saved.item_count(),
        completed = (saved.receipt_status == Some(ReceiptStatus::Completed)),
        "stored partial receiving state"
    );

    let tree = serde_json::to_value(&saved).map_err(internal_error)?;
    state.receipts.lock().await.insert(shipment_id, saved);
    Ok(Json(json!({ "data": tree })))
}

fn internal_error(error: serde_json::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_body(&format!("serialization failure: {error}")),
    )
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// The reference router. CORS is wide open so browser-hosted callers can
/// develop against it.
pub fn router(state: Arc<MockReceivingState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/partialReceiving/:shipment_id", get(get_receipt))
        .route("/api/partialReceiving/:shipment_id", post(save_receipt))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    fn post_request(shipment_id: &str, step: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!(
                "/api/partialReceiving/{shipment_id}?stepNumber={step}"
            ))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    #[tokio::test]
    async fn unknown_shipments_return_not_found() {
        let app = router(MockReceivingState::empty());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/partialReceiving/nope")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response_json(response).await;
        assert!(body["errorMessage"].as_str().is_some());
    }

    #[tokio::test]
    async fn save_expands_flattened_bodies_and_echoes_the_tree() {
        let app = router(MockReceivingState::empty());
        let flat = wire::build_save_request(&demo_receipt()).expect("serializes");

        let response = app
            .oneshot(post_request("demo-shipment", "2", flat))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["data"]["requisition"], "DEMO-001");
        assert_eq!(
            body["data"]["containers"][0]["shipmentItems"][0]["product"]["productCode"],
            "10001"
        );
    }

    #[tokio::test]
    async fn completed_saves_mark_the_shipment_received_and_settle_cancelled_rows() {
        let state = MockReceivingState::empty();
        let app = router(state.clone());

        let mut payload = demo_receipt();
        payload.receipt_status = Some(ReceiptStatus::Completed);
        payload.containers[0].shipment_items[0].cancel_remaining = true;
        let flat = wire::build_save_request(&payload).expect("serializes");

        let response = app
            .oneshot(post_request("demo-shipment", "2", flat))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["data"]["shipmentStatus"], "RECEIVED");
        assert_eq!(
            body["data"]["containers"][0]["shipmentItems"][0]["quantityRemaining"],
            "0"
        );

        let stored = state.receipts.lock().await;
        let saved = stored.get("demo-shipment").expect("stored");
        assert_eq!(saved.shipment_status, ShipmentStatus::Received);
    }

    #[tokio::test]
    async fn other_steps_are_rejected() {
        let app = router(MockReceivingState::empty());
        let response = app
            .oneshot(post_request("demo-shipment", "1", json!({})))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
