//! Cart DTOs
//!
//! The cart is edited one product at a time.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::cart::Cart;

/// Add a quantity of a product
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCartItem {
    #[validate(range(min = 1))]
    pub product_id: i64,

    #[validate(range(min = 1, max = 9999))]
    pub quantity: i32,
}

/// Set the quantity of a product already in the cart (0 removes it)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCartItem {
    #[validate(range(min = 1))]
    pub product_id: i64,

    #[validate(range(min = 0, max = 9999))]
    pub quantity: i32,
}

/// Remove a product from the cart
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemoveCartItem {
    #[validate(range(min = 1))]
    pub product_id: i64,
}

/// Result of a cart mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    pub detail: String,
    pub cart: Cart,
}
