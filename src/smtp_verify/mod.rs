//! SMTP liveness probes.
//!
//! [`ProbeEngine::race`] opens one non-delivering dialogue per candidate host
//! (`HELO`, `MAIL FROM`, `RCPT TO`, `RSET`, `QUIT`) and reports whether any of
//! them accepted the recipient.

mod cancel;
mod dial;
mod engine;
mod error;
mod options;
mod probe;
mod session;
mod types;

pub use cancel::ProbeCancel;
pub use dial::{Dialer, TcpDialer};
pub use engine::ProbeEngine;
pub use error::ProbeError;
pub use options::ProbeOptions;
pub use types::{ProbeStage, ProbeVerdict, RaceOutcome, SmtpReply};

#[cfg(test)]
pub(crate) mod testing;
