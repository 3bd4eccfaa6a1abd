//! Mailbox liveness verification.
//!
//! [`EmailVerifier`] checks the grammar, applies the [`DomainPolicy`],
//! resolves the mail exchangers and races SMTP probes against all of them
//! plus the bare domain. The first accepting probe proves the mailbox.

mod error;

pub use error::{PolicyRejection, VerifyError};

use trust_dns_resolver::Resolver;

use crate::mx::{LookupMx, MxResolver};
use crate::policy::{DomainPolicy, PolicyVerdict};
use crate::smtp_verify::{Dialer, ProbeEngine, RaceOutcome, TcpDialer};
use crate::validator::EmailAddress;

/// Proves that an address is live. Seam for the authenticator.
pub trait MailboxVerifier {
    fn verify(&self, email: &str) -> Result<EmailAddress, VerifyError>;
}

impl<T: MailboxVerifier + ?Sized> MailboxVerifier for &T {
    fn verify(&self, email: &str) -> Result<EmailAddress, VerifyError> {
        (**self).verify(email)
    }
}

/// Full result of a successful verification.
#[derive(Debug)]
pub struct Verification {
    pub address: EmailAddress,
    pub targets: Vec<String>,
    pub outcome: RaceOutcome,
}

pub struct EmailVerifier<R = Resolver, D = TcpDialer> {
    policy: DomainPolicy,
    resolver: MxResolver<R>,
    engine: ProbeEngine<D>,
    blacklist_mx_hosts: bool,
}

impl<R: LookupMx, D: Dialer + 'static> EmailVerifier<R, D> {
    pub fn new(policy: DomainPolicy, lookup: R, engine: ProbeEngine<D>) -> Self {
        Self {
            policy,
            resolver: MxResolver::new(lookup),
            engine,
            blacklist_mx_hosts: true,
        }
    }

    /// Toggles the rule rejecting addresses whose MX host is blacklisted.
    pub fn with_mx_host_rule(mut self, enabled: bool) -> Self {
        self.blacklist_mx_hosts = enabled;
        self
    }

    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    /// Grammar and policy checks, then the probe targets: ranked MX hosts
    /// followed by the bare domain, or the address literal alone.
    pub fn targets(&self, address: &EmailAddress) -> Result<Vec<String>, VerifyError> {
        let email = address.to_string();
        match self.policy.classify(&address.domain) {
            PolicyVerdict::Blacklist { matched: true } => {
                tracing::warn!(%email, "domain is blacklisted");
                return Err(VerifyError::policy(
                    email,
                    PolicyRejection::Blacklisted {
                        domain: address.domain.clone(),
                    },
                ));
            }
            PolicyVerdict::Whitelist { matched: false } => {
                tracing::warn!(%email, "domain is not whitelisted");
                return Err(VerifyError::policy(
                    email,
                    PolicyRejection::NotWhitelisted {
                        domain: address.domain.clone(),
                    },
                ));
            }
            PolicyVerdict::None
            | PolicyVerdict::Blacklist { matched: false }
            | PolicyVerdict::Whitelist { matched: true } => {}
        }

        if let Some(literal) = &address.literal {
            return Ok(vec![literal.clone()]);
        }

        let hosts = self.resolver.resolve(&address.domain)?;
        if self.blacklist_mx_hosts {
            if let Some(host) = hosts
                .iter()
                .find(|mx| self.policy.is_blacklisted_mx_host(&mx.host))
            {
                tracing::warn!(%email, host = %host.host, "mail exchanger is blacklisted");
                return Err(VerifyError::policy(
                    email,
                    PolicyRejection::BlacklistedMxHost {
                        host: host.host.clone(),
                    },
                ));
            }
        }

        let mut targets: Vec<String> = hosts.into_iter().map(|mx| mx.host).collect();
        targets.push(address.domain.clone());
        Ok(targets)
    }

    pub fn verify_report(&self, email: &str) -> Result<Verification, VerifyError> {
        let address = EmailAddress::parse(email)?;
        let targets = self.targets(&address)?;
        let outcome = self.engine.race(&address.to_string(), &targets);
        if outcome.is_accepted() {
            Ok(Verification {
                address,
                targets,
                outcome,
            })
        } else {
            Err(VerifyError::Unreachable {
                email: address.to_string(),
                verdicts: outcome.verdicts,
            })
        }
    }
}

impl<R: LookupMx, D: Dialer + 'static> MailboxVerifier for EmailVerifier<R, D> {
    fn verify(&self, email: &str) -> Result<EmailAddress, VerifyError> {
        self.verify_report(email).map(|verification| verification.address)
    }
}
