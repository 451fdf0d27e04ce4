//! Checkout input and its validation.

use common::{DEFAULT_PAYMENT_METHOD, ProductId, ShippingInfo};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

pub const MAX_RECIPIENT_NAME_LEN: usize = 100;
pub const MAX_ADDRESS_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_PAYMENT_METHOD_LEN: usize = 20;

/// One requested product and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

pub(crate) fn validate_cart(lines: &[CartLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("items", "cart must not be empty"));
    }
    if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
        return Err(DomainError::validation(
            "quantity",
            format!("quantity for product {} must be at least 1", line.product_id),
        ));
    }
    Ok(())
}

fn is_valid_phone(phone: &str) -> bool {
    (10..=11).contains(&phone.len()) && phone.bytes().all(|b| b.is_ascii_digit())
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Checks shipping details and fills in the default payment method.
pub(crate) fn validate_shipping(mut shipping: ShippingInfo) -> Result<ShippingInfo> {
    shipping.recipient_name = shipping.recipient_name.trim().to_string();
    shipping.recipient_phone = shipping.recipient_phone.trim().to_string();
    shipping.shipping_address = shipping.shipping_address.trim().to_string();

    if shipping.recipient_name.is_empty() {
        return Err(DomainError::validation("recipient_name", "must not be blank"));
    }
    check_length(
        "recipient_name",
        &shipping.recipient_name,
        MAX_RECIPIENT_NAME_LEN,
    )?;

    if !is_valid_phone(&shipping.recipient_phone) {
        return Err(DomainError::validation(
            "recipient_phone",
            "must be 10 or 11 digits",
        ));
    }

    if shipping.shipping_address.is_empty() {
        return Err(DomainError::validation(
            "shipping_address",
            "must not be blank",
        ));
    }
    check_length("shipping_address", &shipping.shipping_address, MAX_ADDRESS_LEN)?;

    shipping.notes = shipping
        .notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());
    if let Some(ref notes) = shipping.notes {
        check_length("notes", notes, MAX_NOTES_LEN)?;
    }

    let method = shipping.payment_method.trim();
    shipping.payment_method = if method.is_empty() {
        DEFAULT_PAYMENT_METHOD.to_string()
    } else {
        method.to_string()
    };
    check_length(
        "payment_method",
        &shipping.payment_method,
        MAX_PAYMENT_METHOD_LEN,
    )?;

    Ok(shipping)
}
