//! Cart domain type
//!
//! A cart maps product ids to quantities. The same value lives in two places:
//! the session hash in Redis (anonymous or logged in) and the `cart_items`
//! table for a logged-in user. At login both are merged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by cart mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("product {0} is not in the cart")]
    NotInCart(i64),

    #[error("quantity of product {0} is too large")]
    QuantityTooLarge(i64),
}

/// Product id to quantity
///
/// Serializes as a JSON object whose keys are the product ids as strings,
/// e.g. `{"12": 3}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: BTreeMap<i64, i32>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn quantity(&self, product_id: i64) -> Option<i32> {
        self.items.get(&product_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, i32)> + '_ {
        self.items.iter().map(|(pid, qty)| (*pid, *qty))
    }

    /// Add `quantity` of a product, accumulating onto what is already there
    ///
    /// The cart is left unchanged when the sum does not fit an `i32`.
    pub fn add(&mut self, product_id: i64, quantity: i32) -> Result<(), CartError> {
        let current = self.items.get(&product_id).copied().unwrap_or(0);
        let total = current
            .checked_add(quantity)
            .ok_or(CartError::QuantityTooLarge(product_id))?;
        self.items.insert(product_id, total);
        Ok(())
    }

    /// Set the quantity of a product already in the cart
    ///
    /// A quantity of zero or less removes the product.
    pub fn update(&mut self, product_id: i64, quantity: i32) -> Result<(), CartError> {
        if !self.items.contains_key(&product_id) {
            return Err(CartError::NotInCart(product_id));
        }

        if quantity > 0 {
            self.items.insert(product_id, quantity);
        } else {
            self.items.remove(&product_id);
        }

        Ok(())
    }

    /// Remove a product from the cart
    pub fn remove(&mut self, product_id: i64) -> Result<(), CartError> {
        self.items
            .remove(&product_id)
            .map(|_| ())
            .ok_or(CartError::NotInCart(product_id))
    }

    /// Merge another cart into a copy of this one, summing quantities
    ///
    /// `self` is the persisted cart, `other` the session cart.
    pub fn merged_with(&self, other: &Cart) -> Result<Cart, CartError> {
        let mut merged = self.clone();
        for (product_id, quantity) in other.iter() {
            merged.add(product_id, quantity)?;
        }
        Ok(merged)
    }
}

impl FromIterator<(i64, i32)> for Cart {
    fn from_iter<T: IntoIterator<Item = (i64, i32)>>(iter: T) -> Self {
        Cart {
            items: iter.into_iter().collect(),
        }
    }
}
