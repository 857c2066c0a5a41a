//! Core traits for the dnswatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: List records and switch their status via provider APIs
//! - [`Notifier`]: Send human-readable alerts to operators
//! - [`Prober`]: Measure whether a record value is reachable

pub mod dns_provider;
pub mod notifier;
pub mod prober;

pub use dns_provider::{DnsProvider, DnsProviderFactory, DnsRecord, RecordStatus};
pub use notifier::{Notifier, NotifierFactory};
pub use prober::Prober;
