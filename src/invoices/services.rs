use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};
use crate::invoices::dto::{CreateInvoiceRequest, UpdateInvoiceRequest};
use crate::invoices::repo_types::{Invoice, InvoiceStatus, InvoiceUpdate, LineItem, NewInvoice};
use crate::state::AppState;

const STATUS_INVALID: &str = "Invalid status. Use pending, paid or cancelled";

fn parse_status(raw: Option<String>, errors: &mut FieldErrors) -> Option<InvoiceStatus> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;
    match raw.trim().parse() {
        Ok(status) => Some(status),
        Err(_) => {
            errors.add("status", STATUS_INVALID);
            None
        }
    }
}

/// Validates and creates an invoice.
///
/// Checks run in order and stop at the first failing reference: the item list
/// must be non-empty, the user must exist, then every product must exist with a
/// positive quantity. The lookups and the final insert are separate store calls;
/// a reference deleted in between is not detected.
pub async fn create_invoice(st: &AppState, req: CreateInvoiceRequest) -> Result<Invoice, ApiError> {
    const CTX: &str = "Error while creating invoice";

    let req_items = req.items.unwrap_or_default();
    if req_items.is_empty() {
        return Err(FieldErrors::single("items", "At least one item is required").into());
    }

    let user_id = req.user_id.as_deref().and_then(|id| Uuid::parse_str(id.trim()).ok());
    let user = match user_id {
        Some(id) => st.users.find(id).await.map_err(ApiError::storage(CTX))?,
        None => None,
    };
    let Some(user) = user else {
        warn!(user_id = ?req.user_id, "invoice references unknown user");
        return Err(FieldErrors::single("userId", "User not found").into());
    };

    let mut items = Vec::with_capacity(req_items.len());
    for item in req_items {
        let raw_id = item.product_id.unwrap_or_default();
        let product = match Uuid::parse_str(raw_id.trim()) {
            Ok(id) => st.products.find(id).await.map_err(ApiError::storage(CTX))?,
            Err(_) => None,
        };
        let Some(product) = product else {
            warn!(product_id = %raw_id, "invoice references unknown product");
            return Err(FieldErrors::single(
                "productId",
                format!("Product with id {raw_id} not found"),
            )
            .into());
        };
        let quantity = item.quantity.unwrap_or(0);
        if quantity <= 0 {
            return Err(
                FieldErrors::single("quantity", "Quantity must be greater than zero").into(),
            );
        }
        items.push(LineItem {
            product_id: product.id,
            quantity,
            price: item.price.unwrap_or(product.price),
        });
    }

    let new = build_invoice(user.id, items, req.total_amount, req.status)?;
    debug!(user_id = %new.user_id, items = new.items.len(), "invoice checks passed");

    st.invoices
        .insert(new)
        .await
        .map_err(ApiError::storage(CTX))
}

/// Schema-level rules for an invoice whose references already resolved.
pub fn build_invoice(
    user_id: Uuid,
    items: Vec<LineItem>,
    total_amount: Option<f64>,
    status: Option<String>,
) -> Result<NewInvoice, FieldErrors> {
    let mut errors = FieldErrors::new();

    for (i, item) in items.iter().enumerate() {
        if item.price < 0.0 {
            errors.add(format!("items.{i}.price"), "Price cannot be negative");
        }
    }

    let total_amount = total_amount.unwrap_or_else(|| line_total(&items));
    if !total_amount.is_finite() {
        errors.add("totalAmount", "Total amount must be a finite number");
    } else if total_amount < 0.0 {
        errors.add("totalAmount", "Total amount cannot be negative");
    }

    let status = parse_status(status, &mut errors).unwrap_or_default();

    errors.into_result(NewInvoice {
        user_id,
        items,
        total_amount,
        status,
    })
}

pub fn line_total(items: &[LineItem]) -> f64 {
    items.iter().map(|i| i.quantity as f64 * i.price).sum()
}

/// Works out the store write for a status change.
///
/// A payment date is only produced when the invoice becomes paid and has none
/// recorded; the caller's `paymentDate` wins over `now`.
pub fn plan_update(
    existing: &Invoice,
    req: UpdateInvoiceRequest,
    now: OffsetDateTime,
) -> Result<InvoiceUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();
    let status = parse_status(req.status, &mut errors);

    let mut payment_date = None;
    if status == Some(InvoiceStatus::Paid) && existing.payment_date.is_none() {
        payment_date = match req.payment_date.as_deref().map(str::trim) {
            None | Some("") => Some(now),
            Some(raw) => match OffsetDateTime::parse(raw, &Rfc3339) {
                Ok(ts) => Some(ts),
                Err(_) => {
                    errors.add("paymentDate", "Payment date must be an RFC 3339 timestamp");
                    None
                }
            },
        };
    }

    errors.into_result(InvoiceUpdate {
        status,
        payment_date,
    })
}
