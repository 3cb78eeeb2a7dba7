//! Cart Repository
//!
//! Handles the persisted cart of a logged-in user.

use shopfront_core::domain::cart::Cart;
use sqlx::{PgPool, Postgres, Transaction};

/// Load the persisted cart of a user, `None` when no cart row exists yet
pub async fn find_by_user(pool: &PgPool, user_id: i64) -> Result<Option<Cart>, sqlx::Error> {
    let cart_id: Option<i64> = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    let Some(cart_id) = cart_id else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, CartItemRow>(
        r#"
        SELECT product_id, quantity
        FROM cart_items
        WHERE cart_id = $1
        "#,
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(
        rows.into_iter()
            .map(|r| (r.product_id, r.quantity))
            .collect(),
    ))
}

/// Replace the persisted cart of a user with `cart`
///
/// Creates the cart row on first use. Runs in a single transaction.
pub async fn save(pool: &PgPool, user_id: i64, cart: &Cart) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let cart_id = ensure_cart(&mut tx, user_id).await?;

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

    for (product_id, quantity) in cart.iter() {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

async fn ensure_cart(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO carts (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING id
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: i64,
    quantity: i32,
}
