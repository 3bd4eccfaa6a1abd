use serde::Serialize;

/// A mail exchanger for a domain. Lower preference is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MxHost {
    pub host: String,
    pub preference: u16,
}

impl MxHost {
    pub fn new(host: impl Into<String>, preference: u16) -> Self {
        Self {
            host: host.into(),
            preference,
        }
    }
}
