//! Validation and identifier helpers for the logistics platform
//!
//! The `validate_*` functions follow the `validator` custom-function shape so
//! input structs can use them with `#[validate(custom = "...")]`.

use std::borrow::Cow;

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn is_code_text(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

// ============================================================================
// Catalog Identifiers
// ============================================================================

/// SKU: 3-32 characters, uppercase alphanumeric and dashes
pub fn validate_sku(sku: &str) -> Result<(), ValidationError> {
    if sku.len() < 3 || sku.len() > 32 {
        return Err(invalid("sku_length", "SKU must be 3-32 characters"));
    }
    if !is_code_text(sku) {
        return Err(invalid(
            "sku_format",
            "SKU must contain only uppercase letters, digits and dashes",
        ));
    }
    Ok(())
}

/// Warehouse and carrier codes: 2-20 characters, uppercase alphanumeric and dashes
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.len() < 2 || code.len() > 20 {
        return Err(invalid("code_length", "Code must be 2-20 characters"));
    }
    if !is_code_text(code) {
        return Err(invalid(
            "code_format",
            "Code must contain only uppercase letters, digits and dashes",
        ));
    }
    Ok(())
}

fn short_hex(id: Uuid, len: usize) -> String {
    id.simple().to_string()[..len].to_ascii_uppercase()
}

/// SKU assigned when a product is created without one
pub fn generate_sku(id: Uuid) -> String {
    format!("PRD-{}", short_hex(id, 8))
}

/// Code assigned when a warehouse is created without one
pub fn generate_warehouse_code(id: Uuid) -> String {
    format!("WH-{}", short_hex(id, 6))
}

/// Tracking number for a new shipment
pub fn generate_tracking_number(id: Uuid) -> String {
    format!("TRK-{}", short_hex(id, 12))
}

// ============================================================================
// Order Values
// ============================================================================

/// Unit prices may be zero (samples) but never negative
pub fn validate_unit_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(invalid("unit_price", "Unit price cannot be negative"));
    }
    Ok(())
}
