// # dnswatch-core
//
// Core library for the dnswatch DNS health-failover controller.
//
// ## Architecture Overview
//
// This library provides the core functionality for DNS-based failover:
// - **Prober**: Trait for a single reachability/latency measurement
// - **DnsProvider**: Trait for listing records and switching their status
// - **Notifier**: Trait for alerting operators about switches
// - **HysteresisGate**: Debounced, rate-limited activate/deactivate decision
// - **RecordController**: Per-record probe loop driving one or two gates
// - **WatchSupervisor**: Resolves configuration and spawns one task per record
// - **ProviderRegistry**: Plugin-based registry for providers and notifiers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Task per Record**: Controllers share no mutable state, so no locks
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **No Hidden Retries**: A failed switch is re-attempted only by the gate

pub mod traits;
pub mod gate;
pub mod probe;
pub mod controller;
pub mod supervisor;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, DnsRecord, Notifier, Prober, RecordStatus};
pub use gate::{GateDecision, GatePolicy, HysteresisGate};
pub use probe::TcpProber;
pub use controller::{RecordController, TickReport, WatchEvent, WatchTarget};
pub use supervisor::{WatchHandle, WatchSupervisor};
pub use registry::ProviderRegistry;
pub use config::{LoadBalanceConfig, NotifyConfig, ProviderConfig, WatchConfig, WatchSettings, WatchedDomain};
pub use error::{Error, Result};
pub use tokio_util::sync::CancellationToken;
