//! Events emitted by record controllers

use std::time::Duration;

use crate::traits::RecordStatus;

/// Events emitted by a [`super::RecordController`]
///
/// Events are best-effort: they are sent with `try_send` and dropped when
/// the channel is full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Controller loop started
    Started {
        domain: String,
        value: String,
    },

    /// Probe to the primary value succeeded
    ProbeSucceeded {
        domain: String,
        value: String,
        latency: Duration,
    },

    /// Probe to the primary value failed
    ProbeFailed {
        domain: String,
        value: String,
        error: String,
    },

    /// A record was enabled
    RecordEnabled {
        domain: String,
        record_id: u64,
        value: String,
    },

    /// A record was disabled
    RecordDisabled {
        domain: String,
        record_id: u64,
        value: String,
    },

    /// The provider rejected a status change
    StatusChangeFailed {
        domain: String,
        record_id: u64,
        status: RecordStatus,
        error: String,
    },

    /// A recovery qualified but the cool-down had not elapsed
    ActivationSuppressed {
        domain: String,
        record_id: u64,
    },

    /// The notifier failed to deliver a message
    NotificationFailed {
        domain: String,
        title: String,
        error: String,
    },

    /// Controller loop stopped
    Stopped {
        domain: String,
        value: String,
    },
}

impl WatchEvent {
    /// Zone the event belongs to
    pub fn domain(&self) -> &str {
        match self {
            WatchEvent::Started { domain, .. }
            | WatchEvent::ProbeSucceeded { domain, .. }
            | WatchEvent::ProbeFailed { domain, .. }
            | WatchEvent::RecordEnabled { domain, .. }
            | WatchEvent::RecordDisabled { domain, .. }
            | WatchEvent::StatusChangeFailed { domain, .. }
            | WatchEvent::ActivationSuppressed { domain, .. }
            | WatchEvent::NotificationFailed { domain, .. }
            | WatchEvent::Stopped { domain, .. } => domain,
        }
    }
}
