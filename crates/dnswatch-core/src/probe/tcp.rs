// # TCP Prober
//
// Reachability check by TCP connect.
//
// A probe succeeds when a TCP handshake with `target:port` completes within
// the connect timeout. The connection is closed immediately; no payload is
// exchanged. The elapsed handshake time doubles as the latency sample used by
// load-balance decisions.
//
// A connect that does not finish in time is an `Error::Probe`; a refused or
// unresolvable target is an `Error::Network` carrying the OS error kind.

use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::trace;

use crate::traits::Prober;
use crate::{Error, Result};

/// Port probed when none is configured
pub const DEFAULT_PROBE_PORT: u16 = 80;

/// Connect timeout used when none is configured
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP connect prober
#[derive(Debug, Clone)]
pub struct TcpProber {
    port: u16,
    timeout: Duration,
}

impl TcpProber {
    /// Create a prober for the given port and connect timeout
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Port this prober connects to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connect timeout of a single probe
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect(&self, target: &str) -> std::io::Result<TcpStream> {
        // IPv6 literals cannot go through "host:port" formatting
        match target.parse::<IpAddr>() {
            Ok(ip) => TcpStream::connect(SocketAddr::new(ip, self.port)).await,
            Err(_) => TcpStream::connect((target, self.port)).await,
        }
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &str) -> Result<Duration> {
        let started = Instant::now();

        let stream = tokio::time::timeout(self.timeout, self.connect(target))
            .await
            .map_err(|_| {
                Error::probe(format!(
                    "connect to {}:{} timed out after {:?}",
                    target, self.port, self.timeout
                ))
            })?
            .map_err(|e| {
                Error::Network(std::io::Error::new(
                    e.kind(),
                    format!("connect to {}:{} failed: {}", target, self.port, e),
                ))
            })?;

        let elapsed = started.elapsed();
        drop(stream);

        trace!(target_addr = target, port = self.port, ?elapsed, "probe succeeded");
        Ok(elapsed)
    }
}
