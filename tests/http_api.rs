use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use variant_configurator::http::{router, AppState};
use variant_configurator::infrastructure::{EventPublisher, InMemoryCartRepository, InMemoryCatalog, InMemoryCheckoutHandoff};
use variant_configurator::ProductSnapshot;

fn tee() -> ProductSnapshot {
    serde_json::from_value(json!({
        "id": "tee",
        "name": "Tee",
        "prices": { "price": 20 },
        "catalog": {
            "sizes": [
                { "id": "s-m", "name": "M", "tiers": [{ "id": "t50", "quantity": 50, "unitPrice": 2.0 }] },
                { "id": "s-l", "name": "L" }
            ],
            "colors": [{ "id": "c-red", "name": "Red", "additionalPrice": 5 }]
        }
    }))
    .unwrap()
}

fn app() -> Router {
    let state = AppState::new(
        Arc::new(InMemoryCatalog::with_products([tee()])),
        Arc::new(InMemoryCartRepository::new()),
        Arc::new(InMemoryCheckoutHandoff::new()),
        EventPublisher::disabled(),
    );
    router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_and_catalog() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/products/tee/catalog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["catalog"]["sizes"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::GET, "/api/v1/products/mug/catalog", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quote_prices_and_reports_missing_choices() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/products/tee/quote",
        Some(json!({ "selectedOptions": [{ "name": "Size", "value": "M" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["missingFields"], json!(["Color", "Size Tier"]));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/products/tee/quote",
        Some(json!({
            "selectedOptions": [
                { "name": "Size", "value": "M" },
                { "name": "Tier Quantity", "value": "50" },
                { "name": "Color", "value": "Red" },
                { "name": "Gift Wrap", "value": "Yes" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["missingFields"], json!([]));
    assert_eq!(body["pricing"]["effectiveQuantity"], 50);
    assert_eq!(body["pricing"]["lineTotal"], 350.0);
    let names: Vec<&str> = body["selectedOptions"].as_array().unwrap().iter().map(|o| o["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Size", "Tier Quantity", "Tier Total", "Color"]);
}

#[tokio::test]
async fn quote_rejects_zero_quantity() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/products/tee/quote",
        Some(json!({ "selectedOptions": [], "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cart_line_lifecycle_through_checkout() {
    let app = app();

    let (status, line) = send(
        &app,
        Method::POST,
        "/api/v1/cart/sess-1/lines",
        Some(json!({
            "productId": "tee",
            "quantity": 2,
            "selectedOptions": [{ "name": "Size", "value": "L" }, { "name": "Color", "value": "Red" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let line_id = line["id"].as_str().unwrap().to_string();
    assert!(!line_id.is_empty());
    assert_eq!(line["selectedOptions"][1]["additionalPrice"], 5.0);

    let uri = format!("/api/v1/cart/lines/{line_id}/quantity");
    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "quantity": 0 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, line) = send(&app, Method::PUT, &uri, Some(json!({ "quantity": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line["quantity"], 3);

    let (status, summary) = send(&app, Method::GET, "/api/v1/cart/sess-1/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["subtotal"], 75.0);
    assert_eq!(summary["itemCount"], 3);

    let (status, handed) = send(&app, Method::POST, "/api/v1/cart/sess-1/checkout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(handed["key"], "checkout:sess-1");

    let (status, stored) = send(&app, Method::GET, "/api/v1/checkout/sess-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored, handed["summary"]);
}

#[tokio::test]
async fn options_update_replaces_line_options() {
    let app = app();
    let (_, line) = send(
        &app,
        Method::POST,
        "/api/v1/cart/sess-2/lines",
        Some(json!({ "productId": "tee", "quantity": 1 })),
    )
    .await;
    let line_id = line["id"].as_str().unwrap().to_string();

    let update = json!({
        "selectedOptions": [{ "name": "Color", "value": "Red", "additionalPrice": 5 }],
        "colorId": "c-red"
    });
    let (status, line) = send(&app, Method::PUT, &format!("/api/v1/cart/lines/{line_id}/options"), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line["selectedOptions"].as_array().unwrap().len(), 1);
    assert_eq!(line["optionsUpdate"]["colorId"], "c-red");

    let (status, _) = send(&app, Method::PUT, "/api/v1/cart/lines/missing/options", Some(json!({ "selectedOptions": [] }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let app = app();
    let (status, lines) = send(&app, Method::GET, "/api/v1/cart/nobody", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lines, json!([]));

    let (status, _) = send(&app, Method::POST, "/api/v1/cart/nobody/checkout", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send(&app, Method::GET, "/api/v1/checkout/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tiered_line_is_stored_with_tier_quantity() {
    let app = app();
    let (status, line) = send(
        &app,
        Method::POST,
        "/api/v1/cart/sess-3/lines",
        Some(json!({
            "productId": "tee",
            "quantity": 1,
            "selectedOptions": [{ "name": "Size", "value": "M" }, { "name": "Tier Quantity", "value": "50" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(line["quantity"], 50);

    let (_, summary) = send(&app, Method::GET, "/api/v1/cart/sess-3/summary", None).await;
    assert_eq!(summary["itemCount"], 50);
    assert_eq!(summary["subtotal"], 100.0);
}
