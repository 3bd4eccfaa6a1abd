//! Organisational allow/deny policy over e-mail domains.
//!
//! A [`DomainPolicy`] is built once from configuration and then only read.
//! [`DomainPolicy::classify`] is pure and does a single set lookup.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Snapshot of the configured domain list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DomainPolicy {
    #[default]
    None,
    Blacklist(HashSet<String>),
    Whitelist(HashSet<String>),
}

/// Result of [`DomainPolicy::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum PolicyVerdict {
    None,
    Blacklist { matched: bool },
    Whitelist { matched: bool },
}

impl PolicyVerdict {
    /// `true` when the verdict alone forbids the domain.
    pub fn rejects(&self) -> bool {
        matches!(
            self,
            Self::Blacklist { matched: true } | Self::Whitelist { matched: false }
        )
    }
}

/// Raw `domains:` section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainsConfig {
    #[serde(default)]
    pub blacklist: Option<Vec<String>>,
    #[serde(default)]
    pub whitelist: Option<Vec<String>>,
}

impl From<DomainsConfig> for DomainPolicy {
    fn from(config: DomainsConfig) -> Self {
        // blacklist is looked up first
        if let Some(list) = config.blacklist {
            Self::blacklist(list)
        } else if let Some(list) = config.whitelist {
            Self::whitelist(list)
        } else {
            Self::None
        }
    }
}

impl DomainPolicy {
    pub fn blacklist<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Blacklist(collect_domains(domains))
    }

    pub fn whitelist<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Whitelist(collect_domains(domains))
    }

    pub fn classify(&self, domain: &str) -> PolicyVerdict {
        match self {
            Self::None => PolicyVerdict::None,
            Self::Blacklist(set) => PolicyVerdict::Blacklist {
                matched: set.contains(&normalize_domain(domain)),
            },
            Self::Whitelist(set) => PolicyVerdict::Whitelist {
                matched: set.contains(&normalize_domain(domain)),
            },
        }
    }

    /// MX-host rule: an exchange whose name equals a blacklisted domain.
    ///
    /// Kept apart from [`classify`](Self::classify) because it targets the
    /// relay, not the mailbox domain. Always `false` without a blacklist.
    pub fn is_blacklisted_mx_host(&self, host: &str) -> bool {
        match self {
            Self::Blacklist(set) => set.contains(&normalize_domain(host)),
            Self::None | Self::Whitelist(_) => false,
        }
    }
}

fn collect_domains<I, S>(domains: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    domains
        .into_iter()
        .map(|d| normalize_domain(d.as_ref()))
        .filter(|d| !d.is_empty())
        .collect()
}

pub(crate) fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}
