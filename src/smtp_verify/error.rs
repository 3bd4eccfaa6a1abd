use thiserror::Error;

use super::types::ProbeStage;

/// Why a single probe did not accept the recipient.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: ProbeStage,
        #[source]
        source: std::io::Error,
    },
    #[error("protocol error during {stage}: {message}")]
    Protocol { stage: ProbeStage, message: String },
    #[error("unexpected reply to {stage}: {code} {message}")]
    UnexpectedReply {
        stage: ProbeStage,
        code: u16,
        message: String,
    },
    #[error("probe deadline exceeded before {stage}")]
    DeadlineExceeded { stage: ProbeStage },
    #[error("probe cancelled before {stage}")]
    Cancelled { stage: ProbeStage },
    #[error("could not start probe thread: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    pub(crate) fn connect(host: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            host: host.into(),
            source,
        }
    }

    pub(crate) fn io(stage: ProbeStage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    pub(crate) fn protocol(stage: ProbeStage, message: impl Into<String>) -> Self {
        Self::Protocol {
            stage,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
