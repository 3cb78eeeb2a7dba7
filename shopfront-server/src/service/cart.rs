//! Cart Service
//!
//! Cart mutations on the session cart. When a user is logged in to the
//! session, every change is mirrored into the persisted cart.

use shopfront_core::domain::cart::{Cart, CartError};
use shopfront_core::domain::user::User;
use shopfront_core::dto::cart::{AddCartItem, RemoveCartItem, UpdateCartItem};
use sqlx::PgPool;
use thiserror::Error;

use crate::repository::cart_repository;

/// Service error type
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

async fn sync(pool: &PgPool, user: Option<&User>, cart: &Cart) -> Result<(), sqlx::Error> {
    if let Some(user) = user {
        cart_repository::save(pool, user.id, cart).await?;
        tracing::debug!("Cart of user {} saved ({} items)", user.id, cart.len());
    }
    Ok(())
}

/// Add a product, accumulating onto the quantity already in the cart
pub async fn add_item(
    pool: &PgPool,
    user: Option<&User>,
    mut cart: Cart,
    req: &AddCartItem,
) -> Result<Cart, CartServiceError> {
    cart.add(req.product_id, req.quantity)?;
    sync(pool, user, &cart).await?;
    Ok(cart)
}

pub async fn update_item(
    pool: &PgPool,
    user: Option<&User>,
    mut cart: Cart,
    req: &UpdateCartItem,
) -> Result<Cart, CartServiceError> {
    cart.update(req.product_id, req.quantity)?;
    sync(pool, user, &cart).await?;
    Ok(cart)
}

pub async fn remove_item(
    pool: &PgPool,
    user: Option<&User>,
    mut cart: Cart,
    req: &RemoveCartItem,
) -> Result<Cart, CartServiceError> {
    cart.remove(req.product_id)?;
    sync(pool, user, &cart).await?;
    Ok(cart)
}

/// The cart a user ends up with after logging in to a session
///
/// An anonymous session cart is merged into the user's persisted cart and the
/// result saved. A session that already belongs to a user only ever holds a
/// cart that was persisted for that user, so the persisted cart of the user
/// logging in replaces it unchanged.
pub async fn cart_for_login(
    pool: &PgPool,
    user_id: i64,
    session_user: Option<&User>,
    session_cart: &Cart,
) -> Result<Cart, CartServiceError> {
    let persisted = cart_repository::find_by_user(pool, user_id)
        .await?
        .unwrap_or_default();

    if let Some(previous) = session_user {
        if previous.id != user_id {
            tracing::info!(
                "Session of user {} taken over by user {}, dropping its cart",
                previous.id,
                user_id
            );
        }
        return Ok(persisted);
    }

    let merged = persisted.merged_with(session_cart)?;
    cart_repository::save(pool, user_id, &merged).await?;

    tracing::info!(
        "Merged cart for user {}: {} persisted + {} session -> {} items",
        user_id,
        persisted.len(),
        session_cart.len(),
        merged.len()
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn test_anonymous_changes_stay_off_database() {
        let (state, _cache) = test_state();

        let cart = add_item(
            &state.pool,
            None,
            Cart::new(),
            &AddCartItem {
                product_id: 3,
                quantity: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(cart.quantity(3), Some(2));

        let cart = update_item(
            &state.pool,
            None,
            cart,
            &UpdateCartItem {
                product_id: 3,
                quantity: 0,
            },
        )
        .await
        .unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_product() {
        let (state, _cache) = test_state();

        let result = remove_item(
            &state.pool,
            None,
            Cart::new(),
            &RemoveCartItem { product_id: 1 },
        )
        .await;
        assert!(matches!(
            result,
            Err(CartServiceError::Cart(CartError::NotInCart(1)))
        ));
    }
}
