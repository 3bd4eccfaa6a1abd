use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Opens the transport connection for a probe.
pub trait Dialer: Send + Sync {
    /// `budget` bounds the whole call, every attempted address included.
    fn dial(&self, host: &str, port: u16, budget: Duration) -> io::Result<TcpStream>;
}

/// Resolves `host` (A/AAAA) and connects to the first reachable address.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

fn timed_out(host: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("connect budget exhausted for {host}"),
    )
}

impl Dialer for TcpDialer {
    fn dial(&self, host: &str, port: u16, budget: Duration) -> io::Result<TcpStream> {
        let deadline = Instant::now() + budget;
        // name resolution itself is blocking; it spends the same budget
        let addrs = (host, port).to_socket_addrs()?;
        let mut last_err = None;
        for addr in addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(last_err.unwrap_or_else(|| timed_out(host)));
            }
            match TcpStream::connect_timeout(&addr, remaining) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no socket address available for {host}"),
            )
        }))
    }
}

impl<D: Dialer + ?Sized> Dialer for Arc<D> {
    fn dial(&self, host: &str, port: u16, budget: Duration) -> io::Result<TcpStream> {
        (**self).dial(host, port, budget)
    }
}
