//! Credential life cycle: sign in, prove access, grant and revoke tokens,
//! sign out.
//!
//! A credential is either unregistered or registered. [`Authenticator::sign_in`]
//! moves it to registered once the mailbox is proven live,
//! [`Authenticator::sign_out`] moves it back after a successful access
//! proof. Failed proofs never change state; they only leave an audit row.

mod error;
mod permissions;
mod token;

pub use error::{AuthError, ErrorKind};
pub use permissions::Permissions;
pub use token::{Token, TokenError, TokenIssuer, TokenPayload};

use std::fmt;
use std::sync::OnceLock;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::store::{CredentialKind, CredentialStore, RowStore};
use crate::validator::canonical_identifier;
use crate::verifier::MailboxVerifier;

/// Longest password bcrypt hashes without truncating.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Authentication scheme presented by a caller.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Credentials {
    Basic { email: String, password: String },
    None,
}

impl Credentials {
    pub fn basic(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            email: email.into(),
            password: password.into(),
        }
    }

    fn basic_parts(&self) -> Result<(&str, &str), AuthError> {
        match self {
            Self::Basic { email, password } => Ok((email, password)),
            Self::None => Err(AuthError::MissingCredentials),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
            Self::None => f.write_str("None"),
        }
    }
}

pub struct Authenticator<V, S, T> {
    verifier: V,
    store: CredentialStore<S>,
    issuer: T,
    hash_cost: u32,
    dummy_hash: OnceLock<Option<String>>,
}

impl<V, S, T> Authenticator<V, S, T>
where
    V: MailboxVerifier,
    S: RowStore,
    T: TokenIssuer,
{
    pub fn new(verifier: V, store: S, issuer: T) -> Self {
        Self {
            verifier,
            store: CredentialStore::new(store),
            issuer,
            hash_cost: bcrypt::DEFAULT_COST,
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn store(&self) -> &CredentialStore<S> {
        &self.store
    }

    /// Registers a new credential after proving the mailbox is live.
    pub fn sign_in(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let (email, password) = credentials.basic_parts()?;
        check_password_len(password)?;

        let address = self.verifier.verify(email)?;
        let identifier = address.identifier();
        let kind = CredentialKind::BasicEmail;

        if self.store.exists(&identifier, kind)? {
            return Err(AuthError::Conflict { identifier });
        }
        let hash = bcrypt::hash(password, self.hash_cost).map_err(AuthError::hash)?;
        self.store
            .insert(&identifier, kind, hash.as_bytes(), Utc::now())
            .map_err(|err| log_storage(err.into()))?;

        info!(%identifier, "credential registered");
        Ok(())
    }

    /// Proves the caller holds the password of a registered credential.
    pub fn check_access(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.prove(credentials).map(|_| ())
    }

    /// Proves access, then asks the issuer for a token scoped to `permissions`.
    pub fn grant_token(
        &self,
        credentials: &Credentials,
        permissions: Permissions,
    ) -> Result<Token, AuthError> {
        let (id, identifier) = self.prove(credentials)?;
        let token = self.issuer.gen_token(&TokenPayload {
            client: identifier.clone(),
            permissions,
        })?;
        self.store
            .touch_last_login(id, Utc::now())
            .map_err(|err| log_storage(err.into()))?;

        info!(%identifier, %permissions, "token granted");
        Ok(token)
    }

    /// Proves access, then removes the credential.
    pub fn sign_out(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let (_, identifier) = self.prove(credentials)?;
        // a concurrent sign-out surfaces as NotFound, i.e. Unauthorized
        self.store
            .delete(&identifier, CredentialKind::BasicEmail)
            .map_err(|err| log_storage(err.into()))?;

        info!(%identifier, "credential removed");
        Ok(())
    }

    pub fn revoke_token(&self, token: &Token) -> Result<(), AuthError> {
        self.issuer.revoke_token(token)?;
        Ok(())
    }

    /// `true` when the issuer accepts `token` and it carries every bit of
    /// `required`. An empty requirement never validates.
    pub fn validate(&self, token: &Token, required: Permissions) -> bool {
        if required.is_empty() {
            return false;
        }
        match self.issuer.verify_token(token) {
            Ok(payload) => payload.permissions.contains(required),
            Err(err) => {
                debug!(error = %err, "token rejected");
                false
            }
        }
    }

    /// Returns the credential id and identifier on success.
    fn prove(&self, credentials: &Credentials) -> Result<(i64, String), AuthError> {
        let (email, password) = credentials.basic_parts()?;
        let identifier = canonical_identifier(email);
        let kind = CredentialKind::BasicEmail;

        let secret = match self.store.fetch_secret(&identifier, kind) {
            Ok(secret) => secret,
            Err(crate::store::CredentialError::NotFound { .. }) => {
                self.burn_verification(password);
                warn!(%identifier, "access denied");
                return Err(AuthError::Unauthorized);
            }
            Err(err) => return Err(log_storage(err.into())),
        };

        let matched = password.len() <= MAX_PASSWORD_BYTES
            && match std::str::from_utf8(&secret.hash) {
                Ok(hash) => bcrypt::verify(password, hash).map_err(AuthError::hash)?,
                Err(_) => {
                    return Err(log_storage(AuthError::Storage {
                        source: crate::store::CredentialError::Corrupt {
                            column: "secret_hash",
                        },
                    }));
                }
            };
        if !matched {
            self.store
                .record_failed_attempt(secret.id, Utc::now())
                .map_err(|err| log_storage(err.into()))?;
            warn!(%identifier, "access denied");
            return Err(AuthError::Unauthorized);
        }

        debug!(%identifier, "access proven");
        Ok((secret.id, identifier))
    }

    /// Spends one bcrypt verification so unknown identifiers answer as
    /// slowly as wrong passwords.
    fn burn_verification(&self, password: &str) {
        let dummy = self
            .dummy_hash
            .get_or_init(|| bcrypt::hash("unregistered", self.hash_cost).ok());
        if let Some(hash) = dummy {
            let _ = bcrypt::verify(password, hash);
        }
    }
}

fn check_password_len(password: &str) -> Result<(), AuthError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::PasswordTooLong {
            len: password.len(),
            max: MAX_PASSWORD_BYTES,
        });
    }
    Ok(())
}

fn log_storage(err: AuthError) -> AuthError {
    if err.kind() == ErrorKind::StorageFault {
        error!(error = %err, "credential storage failed");
    }
    err
}
