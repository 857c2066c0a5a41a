//! Watch supervisor
//!
//! The supervisor turns configuration into running record controllers:
//!
//! 1. Resolve every configured entry against the provider's live record list
//! 2. Build one [`RecordController`] per entry
//! 3. Spawn every controller loop as its own task
//!
//! Resolution is all-or-nothing: if any entry cannot be matched, nothing is
//! spawned and the error is returned. Resolution happens once, at startup.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{WatchConfig, WatchedDomain};
use crate::controller::{RecordController, WatchEvent, WatchTarget};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord, Notifier, Prober};

/// Startup orchestration for all watched records
pub struct WatchSupervisor {
    config: WatchConfig,
    provider: Arc<dyn DnsProvider>,
    notifier: Arc<dyn Notifier>,
    prober: Arc<dyn Prober>,
    event_tx: mpsc::Sender<WatchEvent>,
}

impl WatchSupervisor {
    /// Create a supervisor
    ///
    /// # Returns
    ///
    /// A tuple of (supervisor, event_receiver) where event_receiver yields the
    /// events of every controller the supervisor starts
    pub fn new(
        config: WatchConfig,
        provider: Arc<dyn DnsProvider>,
        notifier: Arc<dyn Notifier>,
        prober: Arc<dyn Prober>,
    ) -> Result<(Self, mpsc::Receiver<WatchEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.watch.event_channel_capacity);

        let supervisor = Self {
            config,
            provider,
            notifier,
            prober,
            event_tx: tx,
        };

        Ok((supervisor, rx))
    }

    /// Resolve every configured entry
    ///
    /// Fails on the first entry that cannot be resolved.
    pub async fn resolve(&self) -> Result<Vec<WatchTarget>> {
        let mut targets = Vec::with_capacity(self.config.check_domain.len());
        for watched in &self.config.check_domain {
            targets.push(resolve_target(self.provider.as_ref(), watched).await?);
        }
        Ok(targets)
    }

    /// Resolve every entry and build its controller
    pub async fn controllers(&self) -> Result<Vec<RecordController>> {
        let targets = self.resolve().await?;
        Ok(targets
            .into_iter()
            .map(|target| {
                RecordController::new(
                    target,
                    Arc::clone(&self.provider),
                    Arc::clone(&self.notifier),
                    Arc::clone(&self.prober),
                    &self.config.watch,
                )
                .with_events(self.event_tx.clone())
            })
            .collect())
    }

    /// Resolve every entry and spawn one watch task per entry
    ///
    /// Each task runs until `shutdown` is cancelled. Use
    /// [`WatchHandle::join`] to wait for all of them afterwards.
    pub async fn start(self, shutdown: CancellationToken) -> Result<WatchHandle> {
        let controllers = self.controllers().await?;

        let mut tasks = JoinSet::new();
        for controller in controllers {
            tasks.spawn(controller.run(shutdown.clone()));
        }

        info!("Started {} watch task(s)", tasks.len());
        Ok(WatchHandle { tasks })
    }
}

/// Handle to the spawned watch tasks
pub struct WatchHandle {
    tasks: JoinSet<()>,
}

impl WatchHandle {
    /// Number of tasks still tracked
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are tracked
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every watch task to finish
    ///
    /// Tasks only finish after the shutdown token is cancelled. A task that
    /// panicked is reported as an error once all others have finished.
    pub async fn join(mut self) -> Result<()> {
        let mut failure = None;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!("Watch task terminated abnormally: {}", e);
                failure.get_or_insert_with(|| Error::Other(format!("watch task failed: {}", e)));
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Resolve one configured entry against the provider
///
/// The primary record is matched by name, value and (if configured) routing
/// line. The load-balance record, if any, is matched in the same zone by the
/// same name and its own value and line.
pub async fn resolve_target(provider: &dyn DnsProvider, watched: &WatchedDomain) -> Result<WatchTarget> {
    let records = provider.list_records(&watched.domain).await.map_err(|e| {
        error!(
            domain = %watched.domain,
            provider = provider.provider_name(),
            error = %e,
            "Failed to list records"
        );
        e
    })?;

    let primary = find_record(
        &records,
        &watched.domain,
        &watched.record_name,
        &watched.value,
        watched.routing_line.as_deref(),
    )?;

    let load_balance = match watched.load_balance {
        Some(ref lb) => Some(find_record(
            &records,
            &watched.domain,
            &watched.record_name,
            &lb.value,
            lb.routing_line.as_deref(),
        )?),
        None => None,
    };

    Ok(WatchTarget {
        domain: watched.domain.clone(),
        primary,
        load_balance,
    })
}

fn find_record(
    records: &[DnsRecord],
    domain: &str,
    name: &str,
    value: &str,
    line: Option<&str>,
) -> Result<DnsRecord> {
    match records.iter().find(|r| r.matches(name, value, line)) {
        Some(record) => {
            info!(
                domain = %domain,
                record_id = record.id,
                name = %record.name,
                value = %record.value,
                line = %record.line,
                status = %record.status,
                "Record found"
            );
            Ok(record.clone())
        }
        None => Err(Error::not_found(format!(
            "{} {} -> {}{}",
            domain,
            name,
            value,
            line.map(|l| format!(" (line {})", l)).unwrap_or_default()
        ))),
    }
}
