use std::fmt;

use serde::Serialize;

use super::error::ProbeError;

/// Step of the probe dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeStage {
    Connect,
    Greeting,
    Helo,
    MailFrom,
    RcptTo,
    Rset,
    Quit,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Rset => "RSET",
            Self::Quit => "QUIT",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

/// Outcome of one probe against one host.
#[derive(Debug)]
pub struct ProbeVerdict {
    pub host: String,
    pub accepted: bool,
    pub reason: Option<ProbeError>,
    pub transcript: Vec<String>,
}

impl ProbeVerdict {
    pub(crate) fn accepted(host: impl Into<String>, transcript: Vec<String>) -> Self {
        Self {
            host: host.into(),
            accepted: true,
            reason: None,
            transcript,
        }
    }

    pub(crate) fn rejected(
        host: impl Into<String>,
        reason: ProbeError,
        transcript: Vec<String>,
    ) -> Self {
        Self {
            host: host.into(),
            accepted: false,
            reason: Some(reason),
            transcript,
        }
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            None => write!(f, "{}: accepted", self.host),
            Some(reason) => write!(f, "{}: {reason}", self.host),
        }
    }
}

/// All verdicts observed by one race, in arrival order.
#[derive(Debug, Default)]
pub struct RaceOutcome {
    pub verdicts: Vec<ProbeVerdict>,
    winner: Option<usize>,
}

impl RaceOutcome {
    pub(crate) fn push(&mut self, verdict: ProbeVerdict) {
        if verdict.accepted && self.winner.is_none() {
            self.winner = Some(self.verdicts.len());
        }
        self.verdicts.push(verdict);
    }

    pub fn winner(&self) -> Option<&ProbeVerdict> {
        self.winner.and_then(|idx| self.verdicts.get(idx))
    }

    pub fn is_accepted(&self) -> bool {
        self.winner.is_some()
    }
}
