//! RFC 5322-derived address grammar.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

const DOT_ATOM: &str = r"[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*";
const QUOTED: &str =
    r#""(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*""#;
const HOSTNAME: &str = r"(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?";
const OCTET: &str = r"(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";
const GENERAL_LITERAL: &str =
    r"[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+";

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^(?:{DOT_ATOM}|{QUOTED})@(?:{HOSTNAME}|\[(?:(?:{OCTET}\.){{3}}{OCTET}|{GENERAL_LITERAL})\])$"
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .expect("address grammar is a valid regex")
});

static LOCAL: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(&format!("^(?:{DOT_ATOM}|{QUOTED})$"))
        .case_insensitive(true)
        .build()
        .expect("local-part grammar is a valid regex")
});

/// Full `local@domain` match against the grammar.
pub(crate) fn matches_address(address: &str) -> bool {
    ADDRESS.is_match(address)
}

/// Dot-atom or quoted-string local-part.
pub(crate) fn is_local_valid(local: &str) -> bool {
    LOCAL.is_match(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_atom_rules() {
        assert!(!is_local_valid(".abc"));
        assert!(!is_local_valid("abc."));
        assert!(!is_local_valid("a..b"));
        assert!(is_local_valid("a.b"));
        assert!(is_local_valid("First.Last+tag"));
    }

    #[test]
    fn quoted_local_part() {
        assert!(!is_local_valid("\"a b\""));
        assert!(is_local_valid(r#""a\ b""#));
        assert!(is_local_valid(r#""esc\"aped""#));
        assert!(!is_local_valid("\"unterminated"));
    }

    #[test]
    fn address_literals() {
        assert!(matches_address("user@[192.0.2.1]"));
        assert!(matches_address("user@[IPv6:2001:db8::1]"));
        assert!(!matches_address("user@[300.0.2.1]"));
    }

    #[test]
    fn address_needs_dotted_hostname() {
        assert!(matches_address("user@example.org"));
        assert!(!matches_address("user@localhost"));
        assert!(!matches_address("user@-bad.org"));
    }
}
