use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cancel::{ProbeCancel, Registration};
use super::dial::Dialer;
use super::error::ProbeError;
use super::options::ProbeOptions;
use super::types::{ProbeStage, SmtpReply};

const MAX_LINE: usize = 998;
/// Continuation lines accepted in a single reply.
const MAX_REPLY_LINES: usize = 64;

/// One SMTP connection. Dropping the session closes the socket.
pub(crate) struct SmtpSession {
    host: String,
    stream: TcpStream,
    buffer: Vec<u8>,
    transcript: Vec<String>,
    command_timeout: Duration,
    deadline: Instant,
    cancel: Arc<ProbeCancel>,
    _registration: Registration,
}

impl SmtpSession {
    pub(crate) fn connect<D: Dialer + ?Sized>(
        dialer: &D,
        host: &str,
        options: &ProbeOptions,
        cancel: &Arc<ProbeCancel>,
    ) -> Result<Self, ProbeError> {
        let deadline = Instant::now() + options.deadline();
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled {
                stage: ProbeStage::Connect,
            });
        }
        let budget = options.connect_timeout().min(options.deadline());
        let stream = dialer
            .dial(host, options.port, budget)
            .map_err(|err| ProbeError::connect(host, err))?;
        if Instant::now() >= deadline {
            return Err(ProbeError::DeadlineExceeded {
                stage: ProbeStage::Connect,
            });
        }
        stream
            .set_write_timeout(Some(options.command_timeout()))
            .map_err(|err| ProbeError::io(ProbeStage::Connect, err))?;
        let registration = cancel
            .register(&stream)
            .map_err(|err| ProbeError::io(ProbeStage::Connect, err))?;
        Ok(Self {
            host: host.to_string(),
            stream,
            buffer: Vec::new(),
            transcript: Vec::new(),
            command_timeout: options.command_timeout(),
            deadline,
            cancel: Arc::clone(cancel),
            _registration: registration,
        })
    }

    /// Sends `command` (if any) and requires the reply code to be one of
    /// `expected`.
    pub(crate) fn expect(
        &mut self,
        stage: ProbeStage,
        command: Option<&str>,
        expected: &[u16],
    ) -> Result<SmtpReply, ProbeError> {
        self.checkpoint(stage)?;
        if let Some(command) = command {
            self.send_command(stage, command)?;
        }
        let reply = self.read_reply(stage)?;
        if !expected.contains(&reply.code) {
            return Err(ProbeError::UnexpectedReply {
                stage,
                code: reply.code,
                message: reply.message,
            });
        }
        Ok(reply)
    }

    /// Best-effort `QUIT` after a failed step; the reply is not awaited.
    pub(crate) fn abandon(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.record("C", "QUIT");
        let _ = self.stream.write_all(b"QUIT\r\n");
    }

    /// Ends the session, closing the connection, and hands back the transcript.
    pub(crate) fn finish(self) -> Vec<String> {
        let Self { transcript, .. } = self;
        transcript
    }

    fn checkpoint(&mut self, stage: ProbeStage) -> Result<(), ProbeError> {
        if self.cancel.is_cancelled() {
            return Err(ProbeError::Cancelled { stage });
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProbeError::DeadlineExceeded { stage });
        }
        self.stream
            .set_read_timeout(Some(self.command_timeout.min(remaining)))
            .map_err(|err| ProbeError::io(stage, err))
    }

    fn send_command(&mut self, stage: ProbeStage, command: &str) -> Result<(), ProbeError> {
        self.record("C", command);
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&line)
            .and_then(|()| self.stream.flush())
            .map_err(|err| self.io_error(stage, err))
    }

    fn read_reply(&mut self, stage: ProbeStage) -> Result<SmtpReply, ProbeError> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            let raw = self.read_line(stage)?;
            self.record("S", &raw);
            let Some(code_part) = raw.get(..3) else {
                return Err(ProbeError::protocol(
                    stage,
                    format!("invalid SMTP reply: '{raw}'"),
                ));
            };
            let parsed_code = code_part.parse::<u16>().map_err(|_| {
                ProbeError::protocol(stage, format!("invalid SMTP status code: '{code_part}'"))
            })?;
            if let Some(existing) = code {
                if existing != parsed_code {
                    return Err(ProbeError::protocol(
                        stage,
                        format!("inconsistent SMTP reply codes: {existing} vs {parsed_code}"),
                    ));
                }
            } else {
                code = Some(parsed_code);
            }
            let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
            if continuation && message_lines.len() + 1 >= MAX_REPLY_LINES {
                return Err(ProbeError::protocol(
                    stage,
                    format!("reply exceeds {MAX_REPLY_LINES} lines"),
                ));
            }
            message_lines.push(raw.get(4..).unwrap_or_default().to_string());
            if !continuation {
                break;
            }
        }
        let code =
            code.ok_or_else(|| ProbeError::protocol(stage, "SMTP reply missing status code"))?;
        Ok(SmtpReply {
            code,
            message: message_lines.join("\n"),
        })
    }

    fn read_line(&mut self, stage: ProbeStage) -> Result<String, ProbeError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.ends_with(b"\r") {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|err| ProbeError::protocol(stage, format!("utf8 error: {err}")));
            }
            if self.buffer.len() > MAX_LINE {
                return Err(ProbeError::protocol(stage, "reply line too long"));
            }

            // every read is bounded by what is left of the deadline
            self.checkpoint(stage)?;
            let mut buf = [0u8; 512];
            let read = self
                .stream
                .read(&mut buf)
                .map_err(|err| self.io_error(stage, err))?;
            if read == 0 {
                return Err(self.io_error(
                    stage,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"),
                ));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }

    fn io_error(&self, stage: ProbeStage, err: io::Error) -> ProbeError {
        if self.cancel.is_cancelled() {
            ProbeError::Cancelled { stage }
        } else if matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ) && Instant::now() >= self.deadline
        {
            ProbeError::DeadlineExceeded { stage }
        } else {
            ProbeError::io(stage, err)
        }
    }

    fn record(&mut self, direction: &str, message: &str) {
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }
}
