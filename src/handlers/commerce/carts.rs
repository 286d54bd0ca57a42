use crate::handlers::common::{created_response, json_body, parse_id, success_response};
use crate::{
    errors::ServiceError,
    models::{Cart, Product},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cart))
        .route("/:cid", get(get_cart).delete(clear_cart))
        .route(
            "/:cid/product/:pid",
            post(add_product).put(set_quantity).delete(remove_product),
        )
}

/// Cart line with its product resolved against the catalog
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: Uuid,
    pub quantity: u32,
    /// `None` when the product has been deleted since it was added
    pub product: Option<Product>,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub lines: Vec<CartLineView>,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

/// Create a new cart
async fn create_cart(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.create().await?;
    Ok(created_response(cart))
}

/// Get cart with its products
async fn get_cart(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .carts
        .get_by_id(parse_id("Cart", &cid)?)
        .await?;
    Ok(success_response(resolve_lines(&state, cart).await))
}

/// Add one unit of a catalog product
async fn add_product(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart_id = parse_id("Cart", &cid)?;
    let product_id = parse_id("Product", &pid)?;

    // Only products that exist right now may enter a cart.
    state.services.products.get_by_id(product_id).await?;

    let cart = state
        .services
        .carts
        .add_product(cart_id, product_id)
        .await?;
    Ok(success_response(cart))
}

/// Overwrite the quantity of a line
async fn set_quantity(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
    payload: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart_id = parse_id("Cart", &cid)?;
    let product_id = parse_id("Product", &pid)?;
    let SetQuantityRequest { quantity } = json_body(payload)?;

    let cart = state
        .services
        .carts
        .set_quantity(cart_id, product_id, quantity)
        .await?;
    Ok(success_response(cart))
}

/// Remove a line
async fn remove_product(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart_id = parse_id("Cart", &cid)?;
    let product_id = parse_id("Product", &pid)?;

    let cart = state
        .services
        .carts
        .remove_product(cart_id, product_id)
        .await?;
    Ok(success_response(cart))
}

/// Empty a cart
async fn clear_cart(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .carts
        .clear(parse_id("Cart", &cid)?)
        .await?;
    Ok(success_response(cart))
}

async fn resolve_lines(state: &AppState, cart: Cart) -> CartView {
    let mut lines = Vec::with_capacity(cart.lines.len());
    for line in cart.lines {
        let product = state.services.products.get_by_id(line.product_id).await.ok();
        lines.push(CartLineView {
            product_id: line.product_id,
            quantity: line.quantity,
            product,
        });
    }
    CartView { id: cart.id, lines }
}
