use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
};

use super::{Error, MxHost};

/// DNS collaborator returning raw exchanges in resolver order.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        Ok(lookup
            .iter()
            .map(|mx| MxHost::new(mx.exchange().to_utf8(), mx.preference()))
            .collect())
    }
}

impl<T: LookupMx + ?Sized> LookupMx for &T {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, ResolveError> {
        (**self).lookup_mx(domain)
    }
}

/// Builds a resolver from the system configuration (`/etc/resolv.conf`).
pub fn system_resolver() -> Result<Resolver, Error> {
    Resolver::from_system_conf().map_err(Error::resolver_init)
}

/// Ranks the mail exchangers of a domain.
#[derive(Debug, Clone)]
pub struct MxResolver<R> {
    lookup: R,
}

impl<R: LookupMx> MxResolver<R> {
    pub fn new(lookup: R) -> Self {
        Self { lookup }
    }

    /// Ascending preference; equal preferences keep resolver order. An empty
    /// list is a valid answer.
    pub fn resolve(&self, domain: &str) -> Result<Vec<MxHost>, Error> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(Error::EmptyDomain);
        }
        let mut hosts = self
            .lookup
            .lookup_mx(domain)
            .map_err(|err| Error::lookup(domain, err))?;
        for host in &mut hosts {
            host.host = normalize_exchange(&host.host);
        }
        hosts.retain(|h| !h.host.is_empty());
        // sort_by_key is stable
        hosts.sort_by_key(|h| h.preference);
        tracing::debug!(domain, count = hosts.len(), "resolved mail exchangers");
        Ok(hosts)
    }
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    let trimmed = exchange.trim().trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}
