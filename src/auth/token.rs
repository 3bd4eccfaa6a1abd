use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Permissions;

/// What gets signed: who the token is for and what it may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub client: String,
    pub permissions: Permissions,
}

/// Opaque bearer token. Only the issuer understands its contents.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {source}")]
    Signing {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("token is malformed or its signature does not verify")]
    Invalid,
    #[error("token is unknown or already revoked")]
    Revoked,
    #[error("token expired")]
    Expired,
}

impl TokenError {
    pub fn signing(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Signing {
            source: source.into(),
        }
    }
}

/// Signs, checks and revokes tokens. Owns expiry and the revocation list.
pub trait TokenIssuer {
    fn gen_token(&self, payload: &TokenPayload) -> Result<Token, TokenError>;

    /// Fails with [`TokenError::Revoked`] for unknown or already revoked
    /// tokens.
    fn revoke_token(&self, token: &Token) -> Result<(), TokenError>;

    fn verify_token(&self, token: &Token) -> Result<TokenPayload, TokenError>;
}

impl<T: TokenIssuer + ?Sized> TokenIssuer for &T {
    fn gen_token(&self, payload: &TokenPayload) -> Result<Token, TokenError> {
        (**self).gen_token(payload)
    }

    fn revoke_token(&self, token: &Token) -> Result<(), TokenError> {
        (**self).revoke_token(token)
    }

    fn verify_token(&self, token: &Token) -> Result<TokenPayload, TokenError> {
        (**self).verify_token(token)
    }
}

impl<T: TokenIssuer + ?Sized> TokenIssuer for Arc<T> {
    fn gen_token(&self, payload: &TokenPayload) -> Result<Token, TokenError> {
        (**self).gen_token(payload)
    }

    fn revoke_token(&self, token: &Token) -> Result<(), TokenError> {
        (**self).revoke_token(token)
    }

    fn verify_token(&self, token: &Token) -> Result<TokenPayload, TokenError> {
        (**self).verify_token(token)
    }
}
