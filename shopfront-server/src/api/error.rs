//! API Error Handling
//!
//! Unified error type rendering the envelope
//! `{"error": {"code", "message", "status_code"}}` and the conversions from
//! service-layer errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use shopfront_core::domain::cart::CartError;
use validator::ValidationErrors;

use crate::cache::CacheError;
use crate::service::auth::AuthError;
use crate::service::cart::CartServiceError;
use crate::service::token::TokenError;
use crate::service::user::UserError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// Malformed or invalid request body
    Validation {
        message: String,
        details: Option<ValidationErrors>,
    },
    DatabaseError(sqlx::Error),
    CacheError(CacheError),
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DatabaseError(_) | ApiError::CacheError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::DatabaseError(_) | ApiError::CacheError(_) | ApiError::InternalError(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => {
                tracing::warn!("Handled error: {} - {}", code, msg);
                (msg, None)
            }
            ApiError::Validation { message, details } => {
                tracing::warn!("Validation failed: {}", message);
                (message, details.map(|d| json!(d)))
            }
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                ("Internal server error".to_string(), None)
            }
            ApiError::CacheError(err) => {
                tracing::error!("Cache error: {:?}", err);
                ("Internal server error".to_string(), None)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
            "status_code": status.as_u16(),
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::CacheError(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation {
            message: "Request validation failed".to_string(),
            details: Some(errors),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => ApiError::InternalError(msg),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotInCart(_) => ApiError::BadRequest("product is not in the cart".to_string()),
            CartError::QuantityTooLarge(_) => ApiError::BadRequest("quantity is too large".to_string()),
        }
    }
}

impl From<CartServiceError> for ApiError {
    fn from(err: CartServiceError) -> Self {
        match err {
            CartServiceError::Cart(err) => err.into(),
            CartServiceError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownUser | AuthError::WrongPassword => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Duplicate(_) => ApiError::Conflict(err.to_string()),
            AuthError::Token(err) => err.into(),
            AuthError::Hashing(msg) => ApiError::InternalError(msg),
            AuthError::DatabaseError(err) => ApiError::DatabaseError(err),
            AuthError::CacheError(err) => ApiError::CacheError(err),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => ApiError::NotFound(format!("User {} not found", id)),
            UserError::DatabaseError(err) => ApiError::DatabaseError(err),
            UserError::CacheError(err) => ApiError::CacheError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::NotFound("User 3 not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({
                "error": {
                    "code": "NOT_FOUND",
                    "message": "User 3 not found",
                    "status_code": 404
                }
            })
        );
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let response = ApiError::InternalError("pool exhausted".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        let err: ApiError = TokenError::Expired.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = TokenError::Signing("bad key".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthError::Duplicate("email").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = AuthError::WrongPassword.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_cart_overflow_is_bad_request() {
        let err: ApiError = CartServiceError::Cart(CartError::QuantityTooLarge(4)).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
