use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration knobs for the SMTP probes (`probe:` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeOptions {
    /// Name announced with `HELO`.
    pub helo_name: String,
    /// Envelope sender; `postmaster@<helo_name>` when empty.
    pub mail_from: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
    /// Upper bound for a whole probe, connect included.
    pub deadline_ms: u64,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            helo_name: "localhost".to_string(),
            mail_from: String::new(),
            port: 25,
            connect_timeout_ms: 5_000,
            command_timeout_ms: 5_000,
            deadline_ms: 20_000,
        }
    }
}

impl ProbeOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms.max(1))
    }

    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_name.trim();
        if trimmed.is_empty() { "localhost" } else { trimmed }
    }

    pub fn mail_from(&self) -> String {
        if self.mail_from.trim().is_empty() {
            format!("postmaster@{}", self.helo_name())
        } else {
            self.mail_from.trim().to_string()
        }
    }
}
