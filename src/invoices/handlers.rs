use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    app::route_not_found,
    dto::MessageResponse,
    error::{body, parse_id, ApiError},
    invoices::{
        dto::{CreateInvoiceRequest, UpdateInvoiceRequest},
        repo_types::Invoice,
        services,
    },
    state::AppState,
};

const NOT_FOUND: &str = "Invoice not found";

pub fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/invoices",
            get(list_invoices)
                .post(create_invoice)
                .fallback(route_not_found),
        )
        .route(
            "/invoices/:id",
            get(get_invoice)
                .put(update_invoice)
                .delete(delete_invoice)
                .fallback(route_not_found),
        )
}

#[instrument(skip(state))]
pub async fn list_invoices(State(state): State<AppState>) -> Result<Json<Vec<Invoice>>, ApiError> {
    let invoices = state
        .invoices
        .list()
        .await
        .map_err(ApiError::storage("Error while fetching invoices"))?;
    Ok(Json(invoices))
}

#[instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    state
        .invoices
        .find(id)
        .await
        .map_err(ApiError::storage("Error while fetching invoice"))?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, payload))]
pub async fn create_invoice(
    State(state): State<AppState>,
    payload: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let invoice = services::create_invoice(&state, body(payload)?).await?;
    info!(
        invoice_id = %invoice.id,
        user_id = %invoice.user_id,
        total = invoice.total_amount,
        "invoice created"
    );
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[instrument(skip(state, payload))]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateInvoiceRequest>, JsonRejection>,
) -> Result<Json<Invoice>, ApiError> {
    const CTX: &str = "Error while updating invoice";

    let id = parse_id(&id, NOT_FOUND)?;
    let existing = state
        .invoices
        .find(id)
        .await
        .map_err(ApiError::storage(CTX))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    let changes = services::plan_update(&existing, body(payload)?, OffsetDateTime::now_utc())?;

    let invoice = state
        .invoices
        .update(id, changes)
        .await
        .map_err(ApiError::storage(CTX))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    info!(invoice_id = %invoice.id, status = %invoice.status, "invoice updated");
    Ok(Json(invoice))
}

#[instrument(skip(state))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let removed = state
        .invoices
        .delete(id)
        .await
        .map_err(ApiError::storage("Error while deleting invoice"))?;
    if !removed {
        return Err(ApiError::NotFound(NOT_FOUND));
    }

    info!(invoice_id = %id, "invoice deleted");
    Ok(Json(MessageResponse::new("Invoice deleted successfully")))
}
