#![forbid(unsafe_code)]
//! authcheck_lib: credential issuance gated by SMTP mailbox liveness probes.

pub mod auth;
pub mod config;
pub mod mx;
pub mod policy;
pub mod smtp_verify;
pub mod store;
pub mod validator;
pub mod verifier;

pub use auth::{
    AuthError, Authenticator, Credentials, ErrorKind, Permissions, Token, TokenError, TokenIssuer,
    TokenPayload,
};
pub use config::{AuthConfig, ConfigError};
pub use mx::{Error as MxError, LookupMx, MxHost, MxResolver, system_resolver};
pub use policy::{DomainPolicy, DomainsConfig, PolicyVerdict};
pub use smtp_verify::{
    Dialer, ProbeCancel, ProbeEngine, ProbeError, ProbeOptions, ProbeStage, ProbeVerdict,
    RaceOutcome, TcpDialer,
};
pub use store::{
    Credential, CredentialError, CredentialKind, CredentialStore, MemoryStore, RowStore,
    StoreError,
};
pub use validator::{EmailAddress, MalformedEmail, canonical_identifier};
pub use verifier::{EmailVerifier, MailboxVerifier, PolicyRejection, Verification, VerifyError};
