use crate::error::FieldErrors;
use crate::products::dto::{CreateProductRequest, UpdateProductRequest};
use crate::products::repo_types::{NewProduct, Product, ProductUpdate};

const NAME_REQUIRED: &str = "Product name is required";
const PRICE_INVALID: &str = "Price must be a positive number";
const STOCK_INVALID: &str = "Stock must be a positive number";

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}

/// Checks a create payload and fills in defaults (`stock` = 0).
pub fn validate_new(req: CreateProductRequest) -> Result<NewProduct, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = trimmed(req.name).unwrap_or_default();
    if name.is_empty() {
        errors.add("name", NAME_REQUIRED);
    }

    let price = match req.price {
        Some(p) if p >= 0.0 => p,
        _ => {
            errors.add("price", PRICE_INVALID);
            0.0
        }
    };

    let stock = req.stock.unwrap_or(0);
    if stock < 0 {
        errors.add("stock", STOCK_INVALID);
    }

    errors.into_result(NewProduct {
        name,
        description: trimmed(req.description),
        price,
        stock,
    })
}

/// Range checks for the fields an update may carry.
pub fn validate_update(req: &UpdateProductRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if matches!(req.price, Some(p) if p < 0.0) {
        errors.add("price", PRICE_INVALID);
    }
    if matches!(req.stock, Some(s) if s < 0) {
        errors.add("stock", STOCK_INVALID);
    }
    errors.into_result(())
}

/// Supplied fields win; an absent or blank name keeps the stored one.
pub fn merge(existing: &Product, req: UpdateProductRequest) -> ProductUpdate {
    let name = trimmed(req.name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| existing.name.clone());
    ProductUpdate {
        name,
        description: trimmed(req.description).or_else(|| existing.description.clone()),
        price: req.price.unwrap_or(existing.price),
        stock: req.stock.unwrap_or(existing.stock),
    }
}
