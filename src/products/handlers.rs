use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    app::route_not_found,
    dto::MessageResponse,
    error::{body, parse_id, ApiError},
    products::{
        dto::{CreateProductRequest, UpdateProductRequest},
        repo_types::Product,
        services,
    },
    state::AppState,
};

const NOT_FOUND: &str = "Product not found";

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(list_products)
                .post(create_product)
                .fallback(route_not_found),
        )
        .route(
            "/products/:id",
            get(get_product)
                .put(update_product)
                .delete(delete_product)
                .fallback(route_not_found),
        )
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state
        .products
        .list()
        .await
        .map_err(ApiError::storage("Error while fetching products"))?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    state
        .products
        .find(id)
        .await
        .map_err(ApiError::storage("Error while fetching product"))?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let new = services::validate_new(body(payload)?).map_err(|errors| {
        warn!(fields = ?errors.fields().collect::<Vec<_>>(), "invalid product");
        errors
    })?;

    let product = state
        .products
        .insert(new)
        .await
        .map_err(ApiError::storage("Error while creating product"))?;

    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let existing = state
        .products
        .find(id)
        .await
        .map_err(ApiError::storage("Error while updating product"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    let req = body(payload)?;
    services::validate_update(&req)?;

    let changes = services::merge(&existing, req);
    let product = state
        .products
        .update(id, changes)
        .await
        .map_err(ApiError::storage("Error while updating product"))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    info!(product_id = %product.id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let removed = state
        .products
        .delete(id)
        .await
        .map_err(ApiError::storage("Error while deleting product"))?;
    if !removed {
        return Err(ApiError::NotFound(NOT_FOUND));
    }

    info!(product_id = %id, "product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
