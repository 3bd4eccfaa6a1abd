mod domain;
mod local;
mod types;

pub use types::{EmailAddress, MalformedEmail};

use domain::{literal_address, normalize_domain};
use local::{is_local_valid, matches_address};

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

impl EmailAddress {
    /// Parses and normalises `input`. No network access.
    pub fn parse(input: &str) -> Result<Self, MalformedEmail> {
        let trimmed = input.trim();
        let malformed = |reasons: Vec<String>| MalformedEmail {
            input: input.to_string(),
            reasons,
        };

        let mut reasons = Vec::new();

        if trimmed.len() > MAX_ADDRESS_LEN {
            reasons.push(format!("total length {} > {MAX_ADDRESS_LEN}", trimmed.len()));
        }

        let Some((local, domain)) = trimmed.rsplit_once('@') else {
            reasons.push("must contain an '@'".to_string());
            return Err(malformed(reasons));
        };

        if local.is_empty() || local.len() > MAX_LOCAL_LEN {
            reasons.push(format!(
                "local part length {} invalid (1..={MAX_LOCAL_LEN})",
                local.len()
            ));
        } else if !is_local_valid(local) {
            reasons.push("invalid local part".to_string());
        }

        let literal = literal_address(domain);
        let ascii_domain = if literal.is_some() {
            Some(domain.to_ascii_lowercase())
        } else {
            normalize_domain(domain, &mut reasons)
        };

        if let Some(ascii) = ascii_domain.as_deref() {
            if reasons.is_empty() && !matches_address(&format!("{local}@{ascii}")) {
                reasons.push("address does not match the RFC 5322 grammar".to_string());
            }
        }

        match ascii_domain {
            Some(domain) if reasons.is_empty() => Ok(Self {
                local: local.to_string(),
                domain,
                literal,
            }),
            _ => Err(malformed(reasons)),
        }
    }
}

/// Identifier under which a credential for `email` is stored.
///
/// Falls back to the trimmed input when it does not parse, so lookups for
/// garbage simply miss instead of failing differently.
pub fn canonical_identifier(email: &str) -> String {
    EmailAddress::parse(email)
        .map(|address| address.identifier())
        .unwrap_or_else(|_| email.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_basic() {
        let address = EmailAddress::parse("alice@example.com").unwrap();
        assert_eq!(address.local, "alice");
        assert_eq!(address.domain, "example.com");
        assert!(!address.is_literal());
    }

    #[test]
    fn domain_is_lowercased_local_is_kept() {
        let address = EmailAddress::parse("  Alice@Example.ORG ").unwrap();
        assert_eq!(address.identifier(), "Alice@example.org");
    }

    #[test]
    fn rejects_double_at() {
        assert!(EmailAddress::parse("a@@b.org").is_err());
    }

    #[test]
    fn rejects_missing_at() {
        let err = EmailAddress::parse("invalid").unwrap_err();
        assert_eq!(err.reasons, vec!["must contain an '@'".to_string()]);
    }

    #[test]
    fn quoted_local_with_at_sign() {
        let address = EmailAddress::parse("\"a@b\"@example.org").unwrap();
        assert_eq!(address.local, "\"a@b\"");
    }

    #[test]
    fn ip_literal_domain() {
        let address = EmailAddress::parse("postmaster@[192.0.2.7]").unwrap();
        assert_eq!(address.literal.as_deref(), Some("192.0.2.7"));
        assert_eq!(address.domain, "[192.0.2.7]");
    }

    #[test]
    fn idn_domain_normalized() {
        let address = EmailAddress::parse("alice@exämple.com").unwrap();
        assert!(address.domain.starts_with("xn--"));
    }

    #[test]
    fn overlong_local_part() {
        let email = format!("{}@example.org", "a".repeat(65));
        assert!(EmailAddress::parse(&email).is_err());
    }

    #[test]
    fn canonical_identifier_falls_back_to_input() {
        assert_eq!(canonical_identifier(" nope "), "nope");
        assert_eq!(canonical_identifier("u@EXAMPLE.org"), "u@example.org");
    }

    proptest! {
        #[test]
        fn never_panics(input in "\\PC{0,80}") {
            let _ = EmailAddress::parse(&input);
        }

        #[test]
        fn without_at_is_malformed(input in "[^@]{0,64}") {
            prop_assert!(EmailAddress::parse(&input).is_err());
        }

        #[test]
        fn simple_addresses_parse(local in "[a-z0-9]{1,20}", host in "[a-z]{1,20}") {
            let email = format!("{local}@{host}.org");
            let address = EmailAddress::parse(&email).unwrap();
            prop_assert_eq!(address.identifier(), email);
        }
    }
}
