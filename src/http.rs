//! HTTP surface: catalog, quote, cart record and checkout handoff routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::domain::aggregates::cart::{CartLineItem, CartRepository};
use crate::domain::catalog::{CatalogError, CatalogLoader, CatalogSource, ProductSnapshot};
use crate::domain::events::ConfiguratorEvent;
use crate::domain::options::{self, CartOptionsUpdate, FieldLabels, SelectedOption};
use crate::domain::pricing::{self, LineFacts, PricingResult};
use crate::domain::summary::{self, CartSummary, CheckoutHandoff};
use crate::domain::validation;
use crate::domain::value_objects::{CartLineId, ProductId, SessionId};
use crate::infrastructure::EventPublisher;
use crate::StoreError;

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<CatalogLoader>,
    pub carts: Arc<dyn CartRepository>,
    pub handoff: Arc<dyn CheckoutHandoff>,
    pub labels: Arc<FieldLabels>,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(
        catalogs: Arc<dyn CatalogSource>,
        carts: Arc<dyn CartRepository>,
        handoff: Arc<dyn CheckoutHandoff>,
        events: EventPublisher,
    ) -> Self {
        Self {
            loader: Arc::new(CatalogLoader::new(catalogs)),
            carts,
            handoff,
            labels: Arc::new(FieldLabels::default()),
            events,
        }
    }

    pub fn with_labels(mut self, labels: FieldLabels) -> Self {
        self.labels = Arc::new(labels);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "variant-configurator"})) }))
        .route("/api/v1/products/:id/catalog", get(get_catalog))
        .route("/api/v1/products/:id/quote", post(quote))
        .route("/api/v1/cart/:session", get(get_cart))
        .route("/api/v1/cart/:session/lines", post(add_line))
        .route("/api/v1/cart/:session/summary", get(cart_summary))
        .route("/api/v1/cart/:session/checkout", post(checkout))
        .route("/api/v1/cart/lines/:line_id/options", put(update_options))
        .route("/api/v1/cart/lines/:line_id/quantity", put(update_quantity))
        .route("/api/v1/checkout/:session", get(get_handoff))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn catalog_error(e: CatalogError) -> (StatusCode, String) {
    let status = match &e {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Invalid(_) | CatalogError::Mismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::Source(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

fn store_error(e: StoreError) -> (StatusCode, String) {
    let status = match &e {
        StoreError::LineNotFound(_) | StoreError::HandoffNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidQuantity(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Backend(_) | StoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %e, "cart storage failed");
    }
    (status, e.to_string())
}

fn invalid(e: validator::ValidationErrors) -> (StatusCode, String) {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

async fn get_catalog(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProductSnapshot>> {
    let loaded = s.loader.load(&ProductId::new(id), None).await.map_err(catalog_error)?;
    Ok(Json(loaded.product.as_ref().clone()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub pricing: PricingResult,
    pub missing_fields: Vec<String>,
    pub selected_options: Vec<SelectedOption>,
}

/// Prices a configuration without touching any cart. Options are hydrated
/// through the catalog first, so unknown values are dropped.
async fn quote(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<QuoteRequest>) -> ApiResult<Json<QuoteResponse>> {
    r.validate().map_err(invalid)?;
    let loaded = s.loader.load(&ProductId::new(id), None).await.map_err(catalog_error)?;
    let product = loaded.product.as_ref();

    let selection = options::hydrate(&product.catalog, &r.selected_options, &s.labels);
    let facts = LineFacts::quantity(r.quantity.unwrap_or(1));
    Ok(Json(QuoteResponse {
        pricing: pricing::price_with_labels(&product.catalog, &selection, &product.prices, facts, &s.labels),
        missing_fields: validation::validate_with_labels(&product.catalog, &selection, &s.labels),
        selected_options: options::project(&product.catalog, &selection, &s.labels),
    }))
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> ApiResult<Json<Vec<CartLineItem>>> {
    let lines = s.carts.lines(&SessionId::new(session)).await.map_err(store_error)?;
    Ok(Json(lines))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

async fn add_line(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddLineRequest>,
) -> ApiResult<(StatusCode, Json<CartLineItem>)> {
    r.validate().map_err(invalid)?;
    let session = SessionId::new(session);
    let loaded = s.loader.load(&ProductId::new(r.product_id), None).await.map_err(catalog_error)?;
    let product = loaded.product.as_ref().clone();

    let selection = options::hydrate(&product.catalog, &r.selected_options, &s.labels);
    let selected = options::project(&product.catalog, &selection, &s.labels);
    let quantity = selection.size_tier.as_ref().map_or(r.quantity, |tier| tier.quantity);
    let line = CartLineItem::new(CartLineId::new(""), product.id.clone(), quantity)
        .with_options(selected)
        .with_product(product);

    let id = s.carts.insert_line(&session, line).await.map_err(store_error)?;
    tracing::info!(line_id = %id, session = %session, "configured line added to cart");
    let stored = s.carts.line(&id).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn update_options(
    State(s): State<AppState>,
    Path(line_id): Path<String>,
    Json(update): Json<CartOptionsUpdate>,
) -> ApiResult<Json<CartLineItem>> {
    let line_id = CartLineId::new(line_id);
    s.carts.update_options(&line_id, &update).await.map_err(store_error)?;
    s.events
        .publish(&ConfiguratorEvent::LineOptionsSaved { line_id: line_id.clone(), option_count: update.selected_options.len() })
        .await;
    let line = s.carts.line(&line_id).await.map_err(store_error)?;
    Ok(Json(line))
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuantityRequest {
    #[validate(range(min = 1))]
    pub quantity: u32,
}

async fn update_quantity(
    State(s): State<AppState>,
    Path(line_id): Path<String>,
    Json(r): Json<QuantityRequest>,
) -> ApiResult<Json<CartLineItem>> {
    r.validate().map_err(invalid)?;
    let line_id = CartLineId::new(line_id);
    s.carts.update_quantity(&line_id, r.quantity).await.map_err(store_error)?;
    s.events.publish(&ConfiguratorEvent::LineQuantityChanged { line_id: line_id.clone(), quantity: r.quantity }).await;
    let line = s.carts.line(&line_id).await.map_err(store_error)?;
    Ok(Json(line))
}

async fn cart_summary(State(s): State<AppState>, Path(session): Path<String>) -> ApiResult<Json<CartSummary>> {
    let lines = s.carts.lines(&SessionId::new(session)).await.map_err(store_error)?;
    Ok(Json(summary::summarize_with_labels(&lines, &s.labels)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub key: String,
    pub summary: CartSummary,
}

async fn checkout(State(s): State<AppState>, Path(session): Path<String>) -> ApiResult<Json<CheckoutResponse>> {
    let session = SessionId::new(session);
    let lines = s.carts.lines(&session).await.map_err(store_error)?;
    let summary = summary::summarize_with_labels(&lines, &s.labels);
    if summary.is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "Cart is empty".to_string()));
    }

    let key = s.handoff.hand_off(&session, &summary).await.map_err(store_error)?;
    tracing::info!(session = %session, key = %key, subtotal = %summary.subtotal, "cart handed off to checkout");
    s.events
        .publish(&ConfiguratorEvent::CheckoutHandedOff { session_id: session, key: key.clone(), subtotal: summary.subtotal })
        .await;
    Ok(Json(CheckoutResponse { key, summary }))
}

async fn get_handoff(State(s): State<AppState>, Path(session): Path<String>) -> ApiResult<Json<CartSummary>> {
    let summary = s.handoff.fetch(&SessionId::new(session)).await.map_err(store_error)?;
    Ok(Json(summary))
}
