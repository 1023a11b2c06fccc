//! Order command and read-back endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CommandId, OrderId};
use domain::{Money, OrderItem, ProductId, UserId};
use ledger::LedgerStore;
use serde::{Deserialize, Serialize};
use service::OrderCommandService;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<L: LedgerStore> {
    pub commands: OrderCommandService<L>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Caller-supplied idempotency key; retries must reuse it.
    pub command_id: String,
    pub user_id: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderAcceptedResponse {
    pub order_id: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub total_amount_cents: i64,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

// -- Handlers --

/// POST /orders — create an order idempotently by command id.
#[tracing::instrument(skip(state, req))]
pub async fn create<L: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderAcceptedResponse>), ApiError> {
    let command_id = CommandId::from_uuid(parse_uuid(&req.command_id, "command_id")?);
    let user_id = UserId::from_uuid(parse_uuid(&req.user_id, "user_id")?);

    let items = req
        .items
        .iter()
        .map(|item| {
            Ok(OrderItem::new(
                ProductId::from_uuid(parse_uuid(&item.product_id, "product_id")?),
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            ))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let order_id = state.commands.create_order(command_id, user_id, items).await?;

    // Replays land here too: the caller cannot tell a retry from the
    // original submission, which is the point.
    let response = OrderAcceptedResponse {
        order_id: order_id.to_string(),
    };

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /orders/:id — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<L: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(parse_uuid(&id, "order id")?);
    let order = state
        .commands
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    let items: Vec<OrderItemResponse> = order
        .items()
        .iter()
        .map(|item| OrderItemResponse {
            product_id: item.product_id.to_string(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
        })
        .collect();

    Ok(Json(OrderResponse {
        id: order.id().to_string(),
        user_id: order.user_id().to_string(),
        status: order.status().to_string(),
        total_amount_cents: order.total_amount().cents(),
        items,
        created_at: order.created_at().to_rfc3339(),
    }))
}

fn parse_uuid(value: &str, field: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}
