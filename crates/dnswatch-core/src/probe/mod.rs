// # Prober Implementations
//
// This module provides implementations of the Prober trait.

pub mod tcp;

pub use tcp::{DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT, TcpProber};
