use crate::handlers::common::{
    created_response, json_body, parse_id, success_response, PaginationParams,
};
use crate::{
    errors::ServiceError,
    models::{NewProduct, Page, PageRequest, Product, ProductPatch},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;

use super::product_feed::product_feed;

const PRODUCTS_PATH: &str = "/api/products";

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/feed", get(product_feed))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Listing envelope with navigation links
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub status: &'static str,
    pub payload: Vec<Product>,
    pub total_pages: u64,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
    pub page: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

impl From<Page<Product>> for ProductListResponse {
    fn from(page: Page<Product>) -> Self {
        let page_size = page.page_size;
        let link =
            move |target: u64| format!("{}?page={}&limit={}", PRODUCTS_PATH, target, page_size);
        Self {
            status: "success",
            prev_link: page.prev_page.map(link),
            next_link: page.next_page.map(link),
            total_pages: page.total_pages,
            prev_page: page.prev_page,
            next_page: page.next_page,
            page: page.page,
            has_prev_page: page.has_prev,
            has_next_page: page.has_next,
            payload: page.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedProductResponse {
    pub message: String,
    pub product: Product,
}

/// List products, one page at a time
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = params
        .limit
        .unwrap_or(state.config.default_page_size)
        .min(state.config.max_page_size);
    let request = PageRequest::new(params.page.unwrap_or(1), limit)?;

    let page = state.services.products.list_all(request).await?;
    Ok(success_response(ProductListResponse::from(page)))
}

/// Get a product by ID
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("Product", &id)?;
    let product = state.services.products.get_by_id(id).await?;
    Ok(success_response(product))
}

/// Create a new product
async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = json_body(payload)?;
    let product = state.services.products.create(input).await?;
    Ok(created_response(product))
}

/// Update the fields present in the body
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("Product", &id)?;
    let patch = json_body(payload)?;
    let product = state.services.products.update(id, patch).await?;
    Ok(success_response(product))
}

/// Delete a product
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id("Product", &id)?;
    let product = state.services.products.delete(id).await?;
    Ok(success_response(DeletedProductResponse {
        message: format!("Product {} deleted", product.id),
        product,
    }))
}
