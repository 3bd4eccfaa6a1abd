//! Startup configuration, read once from YAML.
//!
//! ```yaml
//! domains:
//!   blacklist: [spam.example]
//! probe:
//!   helo_name: auth.example.org
//!   deadline_ms: 15000
//! blacklist_mx_hosts: true
//! hash_cost: 12
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trust_dns_resolver::Resolver;

use crate::mx::{Error as MxError, system_resolver};
use crate::policy::{DomainPolicy, DomainsConfig};
use crate::smtp_verify::{ProbeEngine, ProbeOptions};
use crate::verifier::EmailVerifier;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub domains: DomainsConfig,
    pub probe: ProbeOptions,
    /// Reject addresses whose mail exchanger is itself a blacklisted domain.
    pub blacklist_mx_hosts: bool,
    /// bcrypt work factor.
    pub hash_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domains: DomainsConfig::default(),
            probe: ProbeOptions::default(),
            blacklist_mx_hosts: true,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AuthConfig {
    /// Parses a YAML document. An empty document yields the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        let config: Self = if value.is_null() {
            Self::default()
        } else {
            serde_yaml::from_value(value)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn policy(&self) -> DomainPolicy {
        DomainPolicy::from(self.domains.clone())
    }

    /// Verifier backed by the system DNS configuration and plain TCP.
    pub fn verifier(&self) -> Result<EmailVerifier<Resolver>, MxError> {
        let resolver = system_resolver()?;
        Ok(EmailVerifier::new(
            self.policy(),
            resolver,
            ProbeEngine::new(self.probe.clone()),
        )
        .with_mx_host_rule(self.blacklist_mx_hosts))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=31).contains(&self.hash_cost) {
            return Err(ConfigError::Invalid(format!(
                "hash_cost must be between 4 and 31, got {}",
                self.hash_cost
            )));
        }
        if self.probe.port == 0 {
            return Err(ConfigError::Invalid("probe.port must not be 0".into()));
        }
        if self.probe.helo_name.trim().is_empty() {
            return Err(ConfigError::Invalid("probe.helo_name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(AuthConfig::from_yaml_str("").unwrap(), AuthConfig::default());
        assert_eq!(
            AuthConfig::from_yaml_str("# nothing here\n").unwrap(),
            AuthConfig::default()
        );
    }

    #[test]
    fn full_document() {
        let config = AuthConfig::from_yaml_str(
            "domains:\n  whitelist: [Corp.Example]\nprobe:\n  helo_name: auth.test\n  deadline_ms: 1500\nblacklist_mx_hosts: false\nhash_cost: 6\n",
        )
        .unwrap();
        assert_eq!(config.policy(), DomainPolicy::whitelist(["corp.example"]));
        assert_eq!(config.probe.helo_name, "auth.test");
        assert_eq!(config.probe.deadline_ms, 1500);
        assert_eq!(config.probe.port, 25);
        assert!(!config.blacklist_mx_hosts);
        assert_eq!(config.hash_cost, 6);
    }

    #[test]
    fn both_lists_prefer_blacklist() {
        let config = AuthConfig::from_yaml_str(
            "domains:\n  blacklist: [bad.example]\n  whitelist: [good.example]\n",
        )
        .unwrap();
        assert!(matches!(config.policy(), DomainPolicy::Blacklist(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AuthConfig::from_yaml_str("probe:\n  helo: x\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            AuthConfig::from_yaml_str("hash_cost: 3\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AuthConfig::from_yaml_str("probe:\n  port: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AuthConfig::load("/nonexistent/authcheck.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
