//! Cart API Handlers
//!
//! The cart lives in the session; a session user also gets it persisted.

use axum::{Json, extract::State};
use shopfront_core::domain::cart::Cart;
use shopfront_core::dto::cart::{AddCartItem, CartResponse, RemoveCartItem, UpdateCartItem};

use crate::api::error::ApiResult;
use crate::api::extract::ValidatedJson;
use crate::middleware::Session;
use crate::service::cart_service;
use crate::state::AppState;

fn respond(detail: &str, cart: Cart) -> Json<CartResponse> {
    Json(CartResponse {
        detail: detail.to_string(),
        cart,
    })
}

/// GET /cart
pub async fn get_cart(session: Session) -> ApiResult<Json<Cart>> {
    Ok(Json(session.cart().await?))
}

/// POST /cart/add
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(req): ValidatedJson<AddCartItem>,
) -> ApiResult<Json<CartResponse>> {
    let user = session.optional_user().await;
    let cart = session.cart().await?;

    let cart = cart_service::add_item(&state.pool, user.as_ref(), cart, &req).await?;
    session.set_cart(&cart).await?;

    Ok(respond("added to cart", cart))
}

/// PUT /cart/update
pub async fn update_item(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(req): ValidatedJson<UpdateCartItem>,
) -> ApiResult<Json<CartResponse>> {
    let user = session.optional_user().await;
    let cart = session.cart().await?;

    let cart = cart_service::update_item(&state.pool, user.as_ref(), cart, &req).await?;
    session.set_cart(&cart).await?;

    Ok(respond("cart updated", cart))
}

/// DELETE /cart/delete
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(req): ValidatedJson<RemoveCartItem>,
) -> ApiResult<Json<CartResponse>> {
    let user = session.optional_user().await;
    let cart = session.cart().await?;

    let cart = cart_service::remove_item(&state.pool, user.as_ref(), cart, &req).await?;
    session.set_cart(&cart).await?;

    Ok(respond("removed from cart", cart))
}
