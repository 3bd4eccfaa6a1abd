use thiserror::Error;

use crate::mx::Error as MxError;
use crate::smtp_verify::ProbeVerdict;
use crate::validator::MalformedEmail;

/// Which policy rule rejected the address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyRejection {
    #[error("domain `{domain}` is blacklisted")]
    Blacklisted { domain: String },
    #[error("domain `{domain}` is not whitelisted")]
    NotWhitelisted { domain: String },
    #[error("mail exchanger `{host}` is blacklisted")]
    BlacklistedMxHost { host: String },
}

/// Every way [`verify`](super::MailboxVerifier::verify) can refuse an address.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Malformed(#[from] MalformedEmail),
    #[error("the email `{email}` violates the domain policy: {rejection}")]
    Policy {
        email: String,
        rejection: PolicyRejection,
    },
    #[error("mail exchanger resolution failed: {0}")]
    Resolution(#[from] MxError),
    #[error("the mailbox `{email}` is unreachable ({} probes failed)", verdicts.len())]
    Unreachable {
        email: String,
        verdicts: Vec<ProbeVerdict>,
    },
}

impl VerifyError {
    pub(crate) fn policy(email: impl Into<String>, rejection: PolicyRejection) -> Self {
        Self::Policy {
            email: email.into(),
            rejection,
        }
    }
}
