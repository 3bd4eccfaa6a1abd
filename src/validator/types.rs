use serde::Serialize;
use thiserror::Error;

/// A syntactically valid address, domain converted to lowercase ASCII.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmailAddress {
    pub local: String,
    /// ASCII domain, or the bracketed literal as written (lowercased).
    pub domain: String,
    /// Address inside a `[...]` domain literal, tag stripped.
    pub literal: Option<String>,
}

impl EmailAddress {
    /// Canonical credential identifier.
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }

    pub fn is_literal(&self) -> bool {
        self.literal.is_some()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("the email `{input}` has an invalid format: {}", reasons.join("; "))]
pub struct MalformedEmail {
    pub input: String,
    pub reasons: Vec<String>,
}
