//! Record controller
//!
//! A RecordController owns one watched record and is responsible for:
//! - Probing the record value on a fixed interval
//! - Feeding probe outcomes into the primary hysteresis gate
//! - Feeding probe latency into the load-balance gate, if a pair is configured
//! - Switching records via DnsProvider and alerting via Notifier
//!
//! ## Architecture
//!
//! ```text
//!   interval tick
//!        │
//!        ▼
//! ┌─────────────┐  reachable?  ┌───────────────┐   enable / disable
//! │   Prober    │─────────────▶│ primary gate  │──────────────────────┐
//! └─────────────┘              └───────────────┘                      │
//!        │ latency (only when reachable)                              ▼
//!        │                     ┌───────────────┐              ┌──────────────┐
//!        └────────────────────▶│ load-balance  │─────────────▶│ DnsProvider  │
//!                              │     gate      │              │ + Notifier   │
//!                              └───────────────┘              └──────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. Probe the primary value
//! 2. Primary gate: observation = probe succeeded
//! 3. If the probe succeeded and a load-balance record is paired:
//!    load-balance gate: observation = latency above threshold
//! 4. Each action switches one record and sends exactly one notification,
//!    whether the switch succeeded or not
//!
//! Ticks never overlap: a slow probe delays the next tick instead of
//! queueing a burst.

mod events;

pub use events::WatchEvent;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatchSettings;
use crate::error::Result;
use crate::gate::{GateDecision, HysteresisGate};
use crate::traits::{DnsProvider, DnsRecord, Notifier, Prober, RecordStatus};

/// A watched record resolved against the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    /// Zone the records live in
    pub domain: String,
    /// Record whose value is probed
    pub primary: DnsRecord,
    /// Record promoted while the primary is slow
    pub load_balance: Option<DnsRecord>,
}

/// Gate decisions taken during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Whether the primary probe succeeded
    pub reachable: bool,
    /// Primary gate decision
    pub primary: GateDecision,
    /// Load-balance gate decision, when that gate was evaluated
    pub load_balance: Option<GateDecision>,
}

/// Per-record watch loop
///
/// ## Lifecycle
///
/// 1. Create with [`RecordController::new()`]
/// 2. Optionally attach an event channel with [`RecordController::with_events()`]
/// 3. Run with [`RecordController::run()`] until the token is cancelled
///
/// All state is owned by the controller; nothing is shared with other
/// controllers except the provider, notifier and prober handles.
pub struct RecordController {
    actions: RecordActions,
    prober: Arc<dyn Prober>,
    primary_gate: HysteresisGate,
    load_balance_gate: Option<HysteresisGate>,
    interval: Duration,
    latency_threshold: Duration,
    /// Last provider status we know of; may drift if a call failed silently
    is_disabled: bool,
}

impl RecordController {
    /// Create a controller
    ///
    /// Gates are seeded from the record status seen at startup: an enabled
    /// record starts with an active gate.
    pub fn new(
        target: WatchTarget,
        provider: Arc<dyn DnsProvider>,
        notifier: Arc<dyn Notifier>,
        prober: Arc<dyn Prober>,
        settings: &WatchSettings,
    ) -> Self {
        let policy = settings.gate_policy();
        let primary_gate = HysteresisGate::new(policy, target.primary.status.is_enabled());
        let load_balance_gate = target
            .load_balance
            .as_ref()
            .map(|record| HysteresisGate::new(policy, record.status.is_enabled()));
        let is_disabled = !target.primary.status.is_enabled();

        Self {
            actions: RecordActions {
                target,
                provider,
                notifier,
                events: None,
            },
            prober,
            primary_gate,
            load_balance_gate,
            interval: settings.interval(),
            latency_threshold: settings.latency_threshold(),
            is_disabled,
        }
    }

    /// Attach an event channel
    pub fn with_events(mut self, events: mpsc::Sender<WatchEvent>) -> Self {
        self.actions.events = Some(events);
        self
    }

    /// The watched records
    pub fn target(&self) -> &WatchTarget {
        &self.actions.target
    }

    /// Whether the primary record is believed to be disabled
    pub fn is_disabled(&self) -> bool {
        self.is_disabled
    }

    /// Whether the load-balance record is believed to be enabled
    pub fn is_load_balancing(&self) -> bool {
        self.load_balance_gate
            .as_ref()
            .is_some_and(HysteresisGate::is_active)
    }

    /// Run the watch loop until `shutdown` is cancelled
    ///
    /// The first probe happens one interval after start. A probe already in
    /// flight when the token is cancelled is allowed to finish.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut timer = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(timer);

        let target = &self.actions.target;
        info!(
            domain = %target.domain,
            name = %target.primary.name,
            value = %target.primary.value,
            load_balance = ?target.load_balance.as_ref().map(|r| &r.value),
            "Watching record"
        );
        self.actions.emit_event(WatchEvent::Started {
            domain: target.domain.clone(),
            value: target.primary.value.clone(),
        });

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    break;
                }

                Some(_) = ticks.next() => {
                    self.tick().await;
                }
            }
        }

        let target = &self.actions.target;
        info!(domain = %target.domain, value = %target.primary.value, "Watch stopped");
        self.actions.emit_event(WatchEvent::Stopped {
            domain: target.domain.clone(),
            value: target.primary.value.clone(),
        });
    }

    /// Run one probe and evaluate the gates
    pub async fn tick(&mut self) -> TickReport {
        let probe = self.prober.probe(&self.actions.target.primary.value).await;

        let Self {
            actions,
            primary_gate,
            load_balance_gate,
            latency_threshold,
            is_disabled,
            ..
        } = self;
        let actions = &*actions;
        let target = &actions.target;

        match &probe {
            Ok(latency) => {
                debug!(domain = %target.domain, value = %target.primary.value, ?latency, "Endpoint reachable");
                actions.emit_event(WatchEvent::ProbeSucceeded {
                    domain: target.domain.clone(),
                    value: target.primary.value.clone(),
                    latency: *latency,
                });
            }
            Err(e) => {
                warn!(domain = %target.domain, value = %target.primary.value, error = %e, "Endpoint unreachable");
                actions.emit_event(WatchEvent::ProbeFailed {
                    domain: target.domain.clone(),
                    value: target.primary.value.clone(),
                    error: e.to_string(),
                });
            }
        }

        let primary = primary_gate
            .check(
                probe.is_ok(),
                move || actions.enable_primary(),
                move || actions.disable_primary(),
            )
            .await;

        match primary {
            GateDecision::Activated => *is_disabled = false,
            GateDecision::Deactivated => *is_disabled = true,
            GateDecision::CoolingDown => {
                info!(
                    domain = %target.domain,
                    value = %target.primary.value,
                    "Endpoint reachable but the last switch is too recent, keeping record disabled"
                );
                actions.emit_event(WatchEvent::ActivationSuppressed {
                    domain: target.domain.clone(),
                    record_id: target.primary.id,
                });
            }
            _ => {}
        }

        // Load balancing only makes sense while the primary answers
        let load_balance = match (&probe, load_balance_gate.as_mut()) {
            (Ok(latency), Some(gate)) => {
                let slow = *latency > *latency_threshold;
                let decision = gate
                    .check(
                        slow,
                        move || actions.enable_load_balance(),
                        move || actions.disable_load_balance(),
                    )
                    .await;
                if decision == GateDecision::CoolingDown
                    && let Some(ref record) = target.load_balance
                {
                    debug!(domain = %target.domain, value = %record.value, "Latency high but the last switch is too recent");
                    actions.emit_event(WatchEvent::ActivationSuppressed {
                        domain: target.domain.clone(),
                        record_id: record.id,
                    });
                }
                Some(decision)
            }
            _ => None,
        };

        TickReport {
            reachable: probe.is_ok(),
            primary,
            load_balance,
        }
    }
}

/// Side effects of gate transitions
///
/// Kept apart from the gates so a gate can be borrowed mutably while its
/// actions borrow this immutably.
struct RecordActions {
    target: WatchTarget,
    provider: Arc<dyn DnsProvider>,
    notifier: Arc<dyn Notifier>,
    events: Option<mpsc::Sender<WatchEvent>>,
}

impl RecordActions {
    async fn enable_primary(&self) -> Result<()> {
        let record = &self.target.primary;
        let message = format!(
            "Domain: {}, record: {} -> {}, endpoint reachable again, record enabled",
            self.target.domain, record.name, record.value
        );
        self.switch(record, RecordStatus::Enabled, "Endpoint reachable, record enabled", message)
            .await
    }

    async fn disable_primary(&self) -> Result<()> {
        let record = &self.target.primary;
        let message = format!(
            "Domain: {}, record: {} -> {}, endpoint unreachable, record disabled",
            self.target.domain, record.name, record.value
        );
        self.switch(record, RecordStatus::Disabled, "Endpoint unreachable, record disabled", message)
            .await
    }

    async fn enable_load_balance(&self) -> Result<()> {
        let Some(ref record) = self.target.load_balance else {
            return Ok(());
        };
        let message = format!(
            "Domain: {}, record: {} -> {}, latency too high, load-balance record {} enabled",
            self.target.domain, record.name, self.target.primary.value, record.value
        );
        self.switch(record, RecordStatus::Enabled, "Latency high, load-balance record enabled", message)
            .await
    }

    async fn disable_load_balance(&self) -> Result<()> {
        let Some(ref record) = self.target.load_balance else {
            return Ok(());
        };
        let message = format!(
            "Domain: {}, record: {} -> {}, latency recovered, load-balance record {} disabled",
            self.target.domain, record.name, self.target.primary.value, record.value
        );
        self.switch(record, RecordStatus::Disabled, "Latency recovered, load-balance record disabled", message)
            .await
    }

    /// Switch one record and send exactly one notification about it
    async fn switch(
        &self,
        record: &DnsRecord,
        status: RecordStatus,
        title: &str,
        mut message: String,
    ) -> Result<()> {
        let domain = &self.target.domain;
        let result = self
            .provider
            .set_record_status(domain, record.id, status)
            .await;

        match &result {
            Ok(()) => {
                info!(
                    domain = %domain,
                    record_id = record.id,
                    value = %record.value,
                    %status,
                    "Record status changed"
                );
                let event = match status {
                    RecordStatus::Enabled => WatchEvent::RecordEnabled {
                        domain: domain.clone(),
                        record_id: record.id,
                        value: record.value.clone(),
                    },
                    RecordStatus::Disabled => WatchEvent::RecordDisabled {
                        domain: domain.clone(),
                        record_id: record.id,
                        value: record.value.clone(),
                    },
                };
                self.emit_event(event);
            }
            Err(e) => {
                error!(
                    domain = %domain,
                    record_id = record.id,
                    value = %record.value,
                    %status,
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Failed to change record status"
                );
                message.push_str(&format!("\nRecord status change failed: {}", e));
                self.emit_event(WatchEvent::StatusChangeFailed {
                    domain: domain.clone(),
                    record_id: record.id,
                    status,
                    error: e.to_string(),
                });
            }
        }

        if let Err(e) = self.notifier.send(title, &message).await {
            error!(
                domain = %domain,
                notifier = self.notifier.notifier_name(),
                error = %e,
                content = %message,
                "Failed to send notification"
            );
            self.emit_event(WatchEvent::NotificationFailed {
                domain: domain.clone(),
                title: title.to_string(),
                error: e.to_string(),
            });
        }

        result
    }

    /// Emit a watch event
    fn emit_event(&self, event: WatchEvent) {
        let Some(ref tx) = self.events else {
            return;
        };
        // Send event, logging warning if channel is full (backpressure)
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing watch.eventChannelCapacity.");
        }
    }
}
