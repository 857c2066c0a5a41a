// # Prober Trait
//
// A prober performs one reachability measurement against a record value.
//
// ## Implementations
//
// - [`crate::probe::TcpProber`]: TCP connect to a fixed port

use async_trait::async_trait;
use std::time::Duration;

/// Trait for reachability probes
///
/// A probe is single-shot and time-bounded. It never retries: debouncing
/// repeated failures is the job of [`crate::gate::HysteresisGate`].
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a target once
    ///
    /// # Parameters
    ///
    /// - `target`: IP address or hostname taken from the record value
    ///
    /// # Returns
    ///
    /// - `Ok(Duration)`: The target answered; elapsed time of the probe
    /// - `Err(Error)`: The target was unreachable or timed out
    async fn probe(&self, target: &str) -> Result<Duration, crate::Error>;
}
