use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::TokenError;
use crate::store::CredentialError;
use crate::verifier::VerifyError;

/// Closed set of failure kinds a transport maps onto its status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    PolicyViolation,
    ResolutionFailure,
    Unreachable,
    Conflict,
    Unauthorized,
    StorageFault,
    TokenFault,
}

impl ErrorKind {
    /// The caller sent something that will never succeed as is.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::MalformedInput
                | Self::PolicyViolation
                | Self::Unreachable
                | Self::Conflict
                | Self::Unauthorized
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedInput => "malformed input",
            Self::PolicyViolation => "policy violation",
            Self::ResolutionFailure => "resolution failure",
            Self::Unreachable => "unreachable",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::StorageFault => "storage fault",
            Self::TokenFault => "token fault",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no supported credentials were supplied")]
    MissingCredentials,
    #[error("password is {len} bytes long, at most {max} are allowed")]
    PasswordTooLong { len: usize, max: usize },
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("`{identifier}` is already registered")]
    Conflict { identifier: String },
    #[error("invalid credentials")]
    Unauthorized,
    #[error("password hashing failed: {source}")]
    Hash {
        #[source]
        source: bcrypt::BcryptError,
    },
    #[error("credential storage failed: {source}")]
    Storage {
        #[source]
        source: CredentialError,
    },
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentials | Self::PasswordTooLong { .. } => ErrorKind::MalformedInput,
            Self::Verify(err) => match err {
                VerifyError::Malformed(_) => ErrorKind::MalformedInput,
                VerifyError::Policy { .. } => ErrorKind::PolicyViolation,
                VerifyError::Resolution(_) => ErrorKind::ResolutionFailure,
                VerifyError::Unreachable { .. } => ErrorKind::Unreachable,
            },
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Hash { .. } | Self::Storage { .. } => ErrorKind::StorageFault,
            Self::Token(_) => ErrorKind::TokenFault,
        }
    }

    pub(crate) fn hash(source: bcrypt::BcryptError) -> Self {
        Self::Hash { source }
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Conflict { identifier, .. } => Self::Conflict { identifier },
            CredentialError::NotFound { .. } => Self::Unauthorized,
            source => Self::Storage { source },
        }
    }
}

impl From<crate::store::StoreError> for AuthError {
    fn from(err: crate::store::StoreError) -> Self {
        Self::Storage {
            source: CredentialError::Store(err),
        }
    }
}
