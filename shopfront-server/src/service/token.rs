//! Token Service
//!
//! JWT issuance, verification and rotation, plus parsing of the
//! `Authorization` header schemes the API accepts (Basic and Bearer).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use shopfront_core::domain::user::User;
use thiserror::Error;

use crate::config::{ACCESS_TOKEN_TTL, Config, REFRESH_TOKEN_TTL};

/// Token error type
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("authorization header is missing")]
    MissingHeader,

    #[error("invalid token")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("invalid basic token")]
    InvalidBasic,

    #[error("tokens can only be reissued with a refresh token")]
    RotationRequiresRefresh,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Kind of a JWT, carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn ttl_seconds(&self) -> i64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_TTL.as_secs() as i64,
            TokenKind::Refresh => REFRESH_TOKEN_TTL.as_secs() as i64,
        }
    }
}

/// Identity a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: i64,
    pub email: String,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        TokenSubject {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: i64,
    /// Unique per token, so two tokens signed in the same second differ
    #[serde(default)]
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Invalid)
    }

    pub fn subject(&self) -> Result<TokenSubject, TokenError> {
        Ok(TokenSubject {
            id: self.user_id()?,
            email: self.email.clone().ok_or(TokenError::Invalid)?,
        })
    }
}

/// Credentials carried by a Basic authorization header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub identifier: String,
    pub password: String,
}

/// Sign a token of `kind` for `subject`
pub fn sign_token(
    config: &Config,
    subject: &TokenSubject,
    kind: TokenKind,
) -> Result<String, TokenError> {
    let claims = Claims {
        sub: subject.id.to_string(),
        email: Some(subject.email.clone()),
        kind,
        exp: chrono::Utc::now().timestamp() + kind.ttl_seconds(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    encode_claims(config, &claims)
}

fn encode_claims(config: &Config, claims: &Claims) -> Result<String, TokenError> {
    let algorithm = config
        .algorithm()
        .map_err(|e| TokenError::Signing(e.to_string()))?;

    jsonwebtoken::encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verify signature and expiry of a token and return its claims
pub fn verify_token(config: &Config, token: &str) -> Result<Claims, TokenError> {
    let algorithm = config.algorithm().map_err(|_| TokenError::Invalid)?;

    let mut validation = Validation::new(algorithm);
    validation.leeway = 0;

    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

/// Issue a new token of `kind` from a refresh token
pub fn rotate_token(config: &Config, token: &str, kind: TokenKind) -> Result<String, TokenError> {
    let claims = verify_token(config, token)?;

    if claims.kind != TokenKind::Refresh {
        return Err(TokenError::RotationRequiresRefresh);
    }

    sign_token(config, &claims.subject()?, kind)
}

/// Split `<scheme> <token>` and check the scheme
pub fn extract_token(header: Option<&str>, bearer: bool) -> Result<&str, TokenError> {
    let header = header.ok_or(TokenError::MissingHeader)?;
    let expected = if bearer { "Bearer" } else { "Basic" };

    match header.split_once(' ') {
        Some((scheme, token)) if scheme == expected && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(TokenError::Invalid),
    }
}

/// Decode the payload of a Basic token: `base64(identifier:password)`
pub fn decode_basic(token: &str) -> Result<BasicCredentials, TokenError> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|_| TokenError::InvalidBasic)?;
    let decoded = String::from_utf8(bytes).map_err(|_| TokenError::InvalidBasic)?;

    match decoded.split_once(':') {
        Some((identifier, password)) if !identifier.is_empty() && !password.is_empty() => {
            Ok(BasicCredentials {
                identifier: identifier.to_string(),
                password: password.to_string(),
            })
        }
        _ => Err(TokenError::InvalidBasic),
    }
}
