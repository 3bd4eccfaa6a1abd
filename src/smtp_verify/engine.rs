use std::sync::{Arc, mpsc};
use std::thread;

use super::cancel::ProbeCancel;
use super::dial::{Dialer, TcpDialer};
use super::error::ProbeError;
use super::options::ProbeOptions;
use super::probe::probe_host;
use super::types::{ProbeVerdict, RaceOutcome};

/// Probes every candidate host concurrently and races them.
///
/// One thread per host feeds a single channel. The first accepting verdict
/// decides the race and cancels the others; a negative outcome is only
/// declared once every probe has reported.
#[derive(Debug, Clone)]
pub struct ProbeEngine<D = TcpDialer> {
    dialer: Arc<D>,
    options: ProbeOptions,
}

impl ProbeEngine<TcpDialer> {
    pub fn new(options: ProbeOptions) -> Self {
        Self::with_dialer(TcpDialer, options)
    }
}

impl<D: Dialer + 'static> ProbeEngine<D> {
    pub fn with_dialer(dialer: D, options: ProbeOptions) -> Self {
        Self {
            dialer: Arc::new(dialer),
            options,
        }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Probe a single host on the calling thread.
    pub fn probe(&self, email: &str, host: &str) -> ProbeVerdict {
        probe_host(
            self.dialer.as_ref(),
            host,
            email,
            &self.options,
            &ProbeCancel::new(),
        )
    }

    pub fn race(&self, email: &str, hosts: &[String]) -> RaceOutcome {
        let cancel = ProbeCancel::new();
        let (tx, rx) = mpsc::channel::<ProbeVerdict>();
        let mut outcome = RaceOutcome::default();
        let mut in_flight = 0usize;

        for host in hosts {
            let tx = tx.clone();
            let dialer = Arc::clone(&self.dialer);
            let options = self.options.clone();
            let cancel = Arc::clone(&cancel);
            let email = email.to_string();
            let target = host.clone();
            tracing::debug!(host = %target, "starting SMTP probe");
            let spawned = thread::Builder::new()
                .name(format!("smtp-probe-{host}"))
                .spawn(move || {
                    let verdict = probe_host(dialer.as_ref(), &target, &email, &options, &cancel);
                    // the receiver is gone once the race is decided
                    let _ = tx.send(verdict);
                });
            match spawned {
                Ok(_) => in_flight += 1,
                Err(source) => {
                    outcome.push(ProbeVerdict::rejected(
                        host.clone(),
                        ProbeError::Spawn { source },
                        Vec::new(),
                    ));
                }
            }
        }
        drop(tx);

        while in_flight > 0 {
            let Ok(verdict) = rx.recv() else {
                break;
            };
            in_flight -= 1;
            match &verdict.reason {
                None => tracing::debug!(host = %verdict.host, "probe accepted recipient"),
                Some(reason) => tracing::debug!(host = %verdict.host, %reason, "probe failed"),
            }
            let accepted = verdict.accepted;
            outcome.push(verdict);
            if accepted {
                cancel.cancel();
                break;
            }
        }

        tracing::info!(
            email,
            accepted = outcome.is_accepted(),
            observed = outcome.verdicts.len(),
            probes = hosts.len(),
            "probe race decided"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp_verify::testing::{
        MapDialer, MockReply, spawn_chatty_server, spawn_mock_server,
    };
    use std::time::{Duration, Instant};

    const ACCEPT: &[MockReply] = &[
        MockReply::new("HELO", "250 mock.example\r\n"),
        MockReply::new("MAIL FROM:", "250 2.1.0 Ok\r\n"),
        MockReply::new("RCPT TO:", "250 2.1.5 Ok\r\n"),
        MockReply::new("RSET", "250 2.0.0 Reset\r\n"),
        MockReply::new("QUIT", "221 2.0.0 Bye\r\n"),
    ];

    const REFUSE_RCPT: &[MockReply] = &[
        MockReply::new("HELO", "250 mock.example\r\n"),
        MockReply::new("MAIL FROM:", "250 2.1.0 Ok\r\n"),
        MockReply::new("RCPT TO:", "550 5.1.1 User unknown\r\n"),
    ];

    fn options() -> ProbeOptions {
        ProbeOptions {
            connect_timeout_ms: 2_000,
            command_timeout_ms: 2_000,
            deadline_ms: 5_000,
            ..ProbeOptions::default()
        }
    }

    #[test]
    fn single_probe_accepts_full_sequence() {
        let server = spawn_mock_server("220 mx1 ESMTP\r\n", ACCEPT);
        let dialer = MapDialer::new().route("mx1.example.org", server.port);
        let engine = ProbeEngine::with_dialer(dialer, options());

        let verdict = engine.probe("user@example.org", "mx1.example.org");
        assert!(verdict.accepted, "{verdict}");
        assert!(
            verdict
                .transcript
                .iter()
                .any(|line| line.contains("RCPT TO:<user@example.org>"))
        );
        server.join();
    }

    #[test]
    fn refused_recipient_is_a_negative_verdict() {
        let server = spawn_mock_server("220 mx2 ESMTP\r\n", REFUSE_RCPT);
        let dialer = MapDialer::new().route("mx2.example.org", server.port);
        let engine = ProbeEngine::with_dialer(dialer, options());

        let verdict = engine.probe("user@example.org", "mx2.example.org");
        assert!(!verdict.accepted);
        match verdict.reason {
            Some(ProbeError::UnexpectedReply { code, .. }) => assert_eq!(code, 550),
            other => panic!("unexpected reason: {other:?}"),
        }
        server.join();
    }

    #[test]
    fn greeting_other_than_220_fails() {
        let server = spawn_mock_server("554 no service\r\n", &[]);
        let dialer = MapDialer::new().route("mx.example.org", server.port);
        let engine = ProbeEngine::with_dialer(dialer, options());

        let verdict = engine.probe("user@example.org", "mx.example.org");
        assert!(matches!(
            verdict.reason,
            Some(ProbeError::UnexpectedReply { code: 554, .. })
        ));
        server.join();
    }

    #[test]
    fn quit_may_answer_250() {
        let script = [
            MockReply::new("HELO", "250 mock.example\r\n"),
            MockReply::new("MAIL FROM:", "250 Ok\r\n"),
            MockReply::new("RCPT TO:", "250 Ok\r\n"),
            MockReply::new("RSET", "250 Ok\r\n"),
            MockReply::new("QUIT", "250 Bye\r\n"),
        ];
        let server = spawn_mock_server("220 mx ESMTP\r\n", &script);
        let dialer = MapDialer::new().route("mx.example.org", server.port);
        let engine = ProbeEngine::with_dialer(dialer, options());
        assert!(engine.probe("user@example.org", "mx.example.org").accepted);
        server.join();
    }

    #[test]
    fn multiline_replies_are_joined() {
        let script = [
            MockReply::new("HELO", "250-mock.example\r\n250-PIPELINING\r\n250 SIZE\r\n"),
            MockReply::new("MAIL FROM:", "250 Ok\r\n"),
            MockReply::new("RCPT TO:", "250 Ok\r\n"),
            MockReply::new("RSET", "250 Ok\r\n"),
            MockReply::new("QUIT", "221 Bye\r\n"),
        ];
        let server = spawn_mock_server("220-mx first\r\n220 mx ready\r\n", &script);
        let dialer = MapDialer::new().route("mx.example.org", server.port);
        let engine = ProbeEngine::with_dialer(dialer, options());
        assert!(engine.probe("user@example.org", "mx.example.org").accepted);
        server.join();
    }

    #[test]
    fn race_succeeds_when_one_host_accepts() {
        let good = spawn_mock_server("220 mx1 ESMTP\r\n", ACCEPT);
        let bad = spawn_mock_server("220 mx2 ESMTP\r\n", REFUSE_RCPT);
        let dialer = MapDialer::new()
            .route("mx1.example.org", good.port)
            .route("mx2.example.org", bad.port);
        let engine = ProbeEngine::with_dialer(dialer, options());

        let hosts = vec![
            "mx1.example.org".to_string(),
            "mx2.example.org".to_string(),
            "example.org".to_string(),
        ];
        let outcome = engine.race("user@example.org", &hosts);
        assert!(outcome.is_accepted());
        assert_eq!(
            outcome.winner().map(|v| v.host.as_str()),
            Some("mx1.example.org")
        );
        good.join();
    }

    #[test]
    fn race_fails_only_after_every_verdict() {
        let first = spawn_mock_server("220 mx1 ESMTP\r\n", REFUSE_RCPT);
        let second = spawn_mock_server("421 busy\r\n", &[]);
        let dialer = MapDialer::new()
            .route("mx1.example.org", first.port)
            .route("mx2.example.org", second.port);
        let engine = ProbeEngine::with_dialer(dialer, options());

        let hosts = vec![
            "mx1.example.org".to_string(),
            "mx2.example.org".to_string(),
            "example.org".to_string(),
        ];
        let outcome = engine.race("user@example.org", &hosts);
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.verdicts.len(), hosts.len());
        assert!(outcome.verdicts.iter().all(|v| !v.accepted));
        first.join();
        second.join();
    }

    #[test]
    fn race_does_not_wait_for_stalled_losers() {
        let good = spawn_mock_server("220 mx1 ESMTP\r\n", ACCEPT);
        let stalled = crate::smtp_verify::testing::spawn_silent_server(Duration::from_secs(3));
        let dialer = MapDialer::new()
            .route("mx1.example.org", good.port)
            .route("slow.example.org", stalled.port);
        let engine = ProbeEngine::with_dialer(
            dialer,
            ProbeOptions {
                command_timeout_ms: 10_000,
                deadline_ms: 10_000,
                ..options()
            },
        );

        let started = Instant::now();
        let hosts = vec!["slow.example.org".to_string(), "mx1.example.org".to_string()];
        let outcome = engine.race("user@example.org", &hosts);
        assert!(outcome.is_accepted());
        assert!(started.elapsed() < Duration::from_secs(3));
        good.join();
    }

    #[test]
    fn deadline_bounds_silent_server() {
        let stalled = crate::smtp_verify::testing::spawn_silent_server(Duration::from_secs(2));
        let dialer = MapDialer::new().route("slow.example.org", stalled.port);
        let engine = ProbeEngine::with_dialer(
            dialer,
            ProbeOptions {
                command_timeout_ms: 5_000,
                deadline_ms: 200,
                ..options()
            },
        );

        let verdict = engine.probe("user@example.org", "slow.example.org");
        assert!(!verdict.accepted);
        assert!(matches!(
            verdict.reason,
            Some(ProbeError::DeadlineExceeded { .. } | ProbeError::Io { .. })
        ));
    }

    #[test]
    fn endless_continuation_lines_hit_the_deadline() {
        let chatty = spawn_chatty_server(
            "220-still talking\r\n",
            Duration::from_millis(5),
            Duration::from_secs(3),
        );
        let dialer = MapDialer::new().route("chatty.example.org", chatty.port);
        let engine = ProbeEngine::with_dialer(
            dialer,
            ProbeOptions {
                command_timeout_ms: 1_000,
                deadline_ms: 200,
                ..options()
            },
        );

        let started = Instant::now();
        let verdict = engine.probe("user@example.org", "chatty.example.org");
        assert!(started.elapsed() < Duration::from_secs(1), "{verdict}");
        assert!(!verdict.accepted);
        assert!(matches!(
            verdict.reason,
            Some(ProbeError::DeadlineExceeded { .. } | ProbeError::Protocol { .. })
        ));
        assert!(verdict.transcript.len() <= 70);
        chatty.join();
    }

    #[test]
    fn oversized_multiline_reply_is_rejected() {
        let chatty = spawn_chatty_server(
            "220-banner\r\n",
            Duration::from_millis(1),
            Duration::from_secs(2),
        );
        let dialer = MapDialer::new().route("chatty.example.org", chatty.port);
        let engine = ProbeEngine::with_dialer(dialer, options());

        let verdict = engine.probe("user@example.org", "chatty.example.org");
        match verdict.reason {
            Some(ProbeError::Protocol { ref message, .. }) => {
                assert!(message.contains("exceeds"), "{message}")
            }
            ref other => panic!("unexpected reason: {other:?}"),
        }
        chatty.join();
    }

    #[test]
    fn empty_host_list_is_not_accepted() {
        let engine = ProbeEngine::with_dialer(MapDialer::new(), options());
        let outcome = engine.race("user@example.org", &[]);
        assert!(!outcome.is_accepted());
        assert!(outcome.verdicts.is_empty());
    }
}
