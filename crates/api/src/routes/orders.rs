//! Checkout, cancellation, status and order listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Order, OrderId, OrderLineItem, OrderStatus, ShippingInfo};
use domain::CartLine;
use serde::{Deserialize, Serialize};
use store::{OrderSort, Page, PageRequest, SortDirection, SortField, Store};

use crate::auth::Requester;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartLineRequest>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl CreateOrderRequest {
    fn into_parts(self) -> Result<(Vec<CartLine>, ShippingInfo), ApiError> {
        let cart = self
            .items
            .iter()
            .map(|line| Ok(CartLine::new(parse_id(&line.product_id)?, line.quantity)))
            .collect::<Result<Vec<_>, ApiError>>()?;

        let mut shipping =
            ShippingInfo::new(self.recipient_name, self.recipient_phone, self.shipping_address);
        shipping.notes = self.notes;
        if let Some(method) = self.payment_method {
            shipping.payment_method = method;
        }
        Ok((cart, shipping))
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    PageRequest::DEFAULT_SIZE
}

impl PageParams {
    fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

// Query strings cannot go through `#[serde(flatten)]` with numeric fields,
// so the paging fields are repeated.
#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub subtotal_cents: i64,
}

impl From<&OrderLineItem> for OrderItemResponse {
    fn from(item: &OrderLineItem) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product_id.to_string(),
            product_name: item.product_name.clone(),
            unit_price_cents: item.unit_price.cents(),
            quantity: item.quantity,
            subtotal_cents: item.subtotal.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_price_cents: i64,
    pub payment_method: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.owner.as_ref().map(|owner| owner.user_id.to_string()),
            customer_name: order.owner_display().to_string(),
            status: order.status,
            total_price_cents: order.total_price.cents(),
            payment_method: order.shipping.payment_method.clone(),
            recipient_name: order.shipping.recipient_name.clone(),
            recipient_phone: order.shipping.recipient_phone.clone(),
            shipping_address: order.shipping.shipping_address.clone(),
            notes: order.shipping.notes.clone(),
            items: order.items.iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page_number: usize,
    pub page_size: usize,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
}

impl From<Page<Order>> for PageResponse<OrderResponse> {
    fn from(page: Page<Order>) -> Self {
        let page = page.map(|order| OrderResponse::from(&order));
        Self {
            content: page.content,
            page_number: page.page_number,
            page_size: page.page_size,
            total_elements: page.total_elements,
            total_pages: page.total_pages,
            first: page.first,
            last: page.last,
        }
    }
}

fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid id '{raw}': {e}")))
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown order status: {raw}")))
}

// -- Handlers --

/// POST /orders - checkout for the authenticated requester.
#[tracing::instrument(skip(state, requester, req))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let (cart, shipping) = req.into_parts()?;
    let order = state
        .orders
        .create_order(requester.identity(), &cart, shipping)
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// POST /orders/guest - checkout without an account.
#[tracing::instrument(skip(state, req))]
pub async fn create_guest<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let (cart, shipping) = req.into_parts()?;
    let order = state.orders.create_guest_order(&cart, shipping).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/my-orders - the requester's orders, newest first.
#[tracing::instrument(skip(state, requester, params))]
pub async fn my_orders<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let page = state
        .orders
        .list_orders_for_user(requester.identity(), params.request())
        .await?;
    Ok(Json(page.into()))
}

/// GET /orders/{id} - a single order visible to the requester.
#[tracing::instrument(skip(state, requester))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state
        .orders
        .get_order(order_id, requester.identity())
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/{id}/cancel - cancel a pending order and restore its stock.
#[tracing::instrument(skip(state, requester))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state
        .orders
        .cancel_order(order_id, requester.identity())
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/admin - every order, sortable. Administrators only.
#[tracing::instrument(skip(state, requester, params))]
pub async fn list_all<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Query(params): Query<ListParams>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let field = match params.sort_by.as_deref() {
        Some(raw) => raw.parse::<SortField>().map_err(ApiError::BadRequest)?,
        None => SortField::default(),
    };
    let direction = match params.sort_dir.as_deref() {
        Some(raw) => raw.parse::<SortDirection>().map_err(ApiError::BadRequest)?,
        None => SortDirection::default(),
    };

    let page = state
        .orders
        .list_orders(
            requester.identity(),
            PageRequest::new(params.page, params.size),
            OrderSort::new(field, direction),
        )
        .await?;
    Ok(Json(page.into()))
}

/// GET /orders/admin/status/{status} - orders in one status. Administrators only.
#[tracing::instrument(skip(state, requester, params))]
pub async fn list_by_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Path(status): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let status = parse_status(&status)?;
    let page = state
        .orders
        .list_orders_by_status(requester.identity(), status, params.request())
        .await?;
    Ok(Json(page.into()))
}

/// GET /orders/admin/search - keyword search. Administrators only.
#[tracing::instrument(skip(state, requester, params))]
pub async fn search<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Query(params): Query<SearchParams>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let page = state
        .orders
        .search_orders(
            requester.identity(),
            &params.keyword,
            PageRequest::new(params.page, params.size),
        )
        .await?;
    Ok(Json(page.into()))
}

/// PUT /orders/admin/{id}/status - force a status. Administrators only.
#[tracing::instrument(skip(state, requester, req))]
pub async fn update_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    requester: Requester,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    requester.require_admin()?;
    let order_id: OrderId = parse_id(&id)?;
    let status = parse_status(&req.status)?;

    let order = state.orders.update_status(order_id, status).await?;
    Ok(Json(OrderResponse::from(&order)))
}
