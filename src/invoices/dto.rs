use serde::Deserialize;

/// Identifiers arrive as strings so a malformed one can be reported on its field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    /// Unit price; the product's current price when omitted.
    pub price: Option<f64>,
}

/// Request body for `POST /invoices`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub user_id: Option<String>,
    /// Missing and `null` both count as an empty list.
    pub items: Option<Vec<LineItemRequest>>,
    /// Computed from the line items when omitted.
    pub total_amount: Option<f64>,
    pub status: Option<String>,
}

/// Request body for `PUT /invoices/:id`. Only the status is mutable.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub status: Option<String>,
    /// RFC 3339; defaults to now when the invoice becomes paid.
    pub payment_date: Option<String>,
}
