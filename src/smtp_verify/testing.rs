//! Loopback SMTP fixtures shared by the probe and verifier tests.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use super::dial::Dialer;

/// Expected command prefix and the raw reply to send back.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MockReply {
    pub expected: &'static str,
    pub response: &'static str,
}

impl MockReply {
    pub(crate) const fn new(expected: &'static str, response: &'static str) -> Self {
        Self { expected, response }
    }
}

pub(crate) struct MockServer {
    pub port: u16,
    handle: thread::JoinHandle<()>,
}

impl MockServer {
    pub(crate) fn join(self) {
        self.handle.join().expect("mock server thread");
    }
}

/// Serves one scripted session on 127.0.0.1.
pub(crate) fn spawn_mock_server(greeting: &'static str, script: &[MockReply]) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let script = script.to_vec();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .expect("read timeout");
            let _ = handle_session(&mut stream, greeting, &script);
        }
    });
    MockServer { port, handle }
}

fn handle_session(
    stream: &mut TcpStream,
    greeting: &str,
    script: &[MockReply],
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(greeting.as_bytes())?;
    stream.flush()?;
    for step in script {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        assert!(
            line.starts_with(step.expected),
            "expected command starting with '{}', got '{line}'",
            step.expected
        );
        stream.write_all(step.response.as_bytes())?;
        stream.flush()?;
    }
    // hold the connection until the client hangs up
    let mut sink = Vec::new();
    let _ = reader.read_to_end(&mut sink);
    Ok(())
}

/// Accepts a connection and never says anything.
pub(crate) fn spawn_silent_server(hold: Duration) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind silent server");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(hold);
            drop(stream);
        }
    });
    MockServer { port, handle }
}

/// Keeps writing `line` every `interval` for up to `total`, never finishing
/// the reply. Stops once the client hangs up.
pub(crate) fn spawn_chatty_server(
    line: &'static str,
    interval: Duration,
    total: Duration,
) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind chatty server");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let started = std::time::Instant::now();
            while started.elapsed() < total {
                if stream.write_all(line.as_bytes()).is_err() {
                    return;
                }
                thread::sleep(interval);
            }
        }
    });
    MockServer { port, handle }
}

/// Routes host names to loopback ports; anything else is refused.
#[derive(Debug, Default)]
pub(crate) struct MapDialer {
    routes: HashMap<String, u16>,
    dials: AtomicUsize,
}

impl MapDialer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(mut self, host: &str, port: u16) -> Self {
        self.routes.insert(host.to_string(), port);
        self
    }

    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

impl Dialer for MapDialer {
    fn dial(&self, host: &str, _port: u16, timeout: Duration) -> io::Result<TcpStream> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        match self.routes.get(host) {
            Some(port) => {
                let addr: SocketAddr = ([127, 0, 0, 1], *port).into();
                TcpStream::connect_timeout(&addr, timeout)
            }
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no route to {host}"),
            )),
        }
    }
}
