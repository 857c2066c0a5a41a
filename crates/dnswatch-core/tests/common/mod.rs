//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles for the provider, notifier and
//! prober seams. Every double records what it was asked to do so tests can
//! assert on side effects.

#![allow(dead_code)]

use dnswatch_core::config::{WatchConfig, WatchSettings, WatchedDomain};
use dnswatch_core::controller::{RecordController, WatchTarget};
use dnswatch_core::error::{Error, Result};
use dnswatch_core::traits::{DnsProvider, DnsRecord, Notifier, Prober, RecordStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build a provider record
pub fn record(id: u64, name: &str, value: &str, status: RecordStatus) -> DnsRecord {
    DnsRecord {
        id,
        name: name.to_string(),
        value: value.to_string(),
        line: "default".to_string(),
        status,
    }
}

/// A mock DnsProvider holding an in-memory zone
pub struct MockDnsProvider {
    /// Records per zone
    zones: Mutex<std::collections::HashMap<String, Vec<DnsRecord>>>,
    /// Every status call, successful or not
    status_calls: Mutex<Vec<(u64, RecordStatus)>>,
    /// Call counter for list_records()
    list_call_count: AtomicUsize,
    /// Make set_record_status() fail
    fail_status: AtomicBool,
    /// Make list_records() fail
    fail_list: AtomicBool,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            zones: Mutex::new(std::collections::HashMap::new()),
            status_calls: Mutex::new(Vec::new()),
            list_call_count: AtomicUsize::new(0),
            fail_status: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
        }
    }

    /// Create a provider with one zone
    pub fn with_zone(domain: &str, records: Vec<DnsRecord>) -> Self {
        let provider = Self::new();
        provider.add_zone(domain, records);
        provider
    }

    pub fn add_zone(&self, domain: &str, records: Vec<DnsRecord>) {
        self.zones
            .lock()
            .unwrap()
            .insert(domain.to_string(), records);
    }

    /// Make every following status change fail (or succeed again)
    pub fn fail_status_changes(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    /// Make every following record listing fail
    pub fn fail_listing(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Current status of a record in the in-memory zone
    pub fn status_of(&self, record_id: u64) -> Option<RecordStatus> {
        self.zones
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|r| r.id == record_id)
            .map(|r| r.status)
    }

    /// Every status call received, in order
    pub fn status_calls(&self) -> Vec<(u64, RecordStatus)> {
        self.status_calls.lock().unwrap().clone()
    }

    /// Number of status calls received
    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }

    /// Get the number of times list_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "listing unavailable"));
        }
        self.zones
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("zone {}", domain)))
    }

    async fn set_record_status(
        &self,
        _domain: &str,
        record_id: u64,
        status: RecordStatus,
    ) -> Result<()> {
        self.status_calls
            .lock()
            .unwrap()
            .push((record_id, status));

        if self.fail_status.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "record locked"));
        }

        let mut zones = self.zones.lock().unwrap();
        let record = zones
            .values_mut()
            .flatten()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::not_found(format!("record {}", record_id)))?;
        record.status = status;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A mock Notifier that keeps every message
pub struct MockNotifier {
    messages: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every following send fail (the message is still recorded)
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every (title, content) sent, in order
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, title: &str, content: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), content.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::notifier("push endpoint returned 500"));
        }
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "mock"
    }
}

/// A prober that replays scripted outcomes, then repeats a fallback
pub struct ScriptedProber {
    script: Mutex<VecDeque<std::result::Result<Duration, String>>>,
    fallback: Mutex<std::result::Result<Duration, String>>,
    targets: Mutex<Vec<String>>,
}

impl ScriptedProber {
    /// A prober that answers every probe with `latency`
    pub fn reachable(latency: Duration) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(latency)),
            targets: Mutex::new(Vec::new()),
        }
    }

    /// A prober that fails every probe
    pub fn unreachable() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Err("connection refused".to_string())),
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Queue `count` successful probes with the given latency
    pub fn push_up(&self, count: usize, latency: Duration) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..count {
            script.push_back(Ok(latency));
        }
    }

    /// Queue `count` failed probes
    pub fn push_down(&self, count: usize) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..count {
            script.push_back(Err("connection refused".to_string()));
        }
    }

    /// Replace the outcome used once the script is exhausted
    pub fn set_fallback_up(&self, latency: Duration) {
        *self.fallback.lock().unwrap() = Ok(latency);
    }

    pub fn set_fallback_down(&self) {
        *self.fallback.lock().unwrap() = Err("connection refused".to_string());
    }

    /// Targets probed so far
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.targets.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, target: &str) -> Result<Duration> {
        self.targets.lock().unwrap().push(target.to_string());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        next.map_err(Error::probe)
    }
}

/// Fast latency, below the default load-balance threshold
pub const FAST: Duration = Duration::from_millis(20);

/// Slow latency, above the default load-balance threshold
pub const SLOW: Duration = Duration::from_millis(250);

/// Helper to create a minimal WatchConfig for testing
pub fn minimal_config(entries: Vec<WatchedDomain>) -> WatchConfig {
    let mut config = WatchConfig::new();
    config.secret_id = "test-id".to_string();
    config.secret_key = "test-key".to_string();
    config.check_domain = entries;
    config.watch.event_channel_capacity = 100;
    config
}

/// A controller wired to shared test doubles
pub struct Harness {
    pub provider: Arc<MockDnsProvider>,
    pub notifier: Arc<MockNotifier>,
    pub prober: Arc<ScriptedProber>,
    pub controller: RecordController,
}

impl Harness {
    pub fn new(target: WatchTarget, prober: ScriptedProber, settings: &WatchSettings) -> Self {
        let mut records = vec![target.primary.clone()];
        records.extend(target.load_balance.clone());
        let provider = Arc::new(MockDnsProvider::with_zone(&target.domain, records));
        let notifier = Arc::new(MockNotifier::new());
        let prober = Arc::new(prober);

        let controller = RecordController::new(
            target,
            Arc::clone(&provider) as Arc<dyn DnsProvider>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&prober) as Arc<dyn Prober>,
            settings,
        );

        Self {
            provider,
            notifier,
            prober,
            controller,
        }
    }

    /// Run `count` ticks
    pub async fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.controller.tick().await;
        }
    }
}

/// Primary-only target for "example.com www -> 1.2.3.4"
pub fn primary_target(status: RecordStatus) -> WatchTarget {
    WatchTarget {
        domain: "example.com".to_string(),
        primary: record(100, "www", "1.2.3.4", status),
        load_balance: None,
    }
}

/// Target with a load-balance pair "www -> 5.6.7.8"
pub fn paired_target(primary: RecordStatus, load_balance: RecordStatus) -> WatchTarget {
    WatchTarget {
        domain: "example.com".to_string(),
        primary: record(100, "www", "1.2.3.4", primary),
        load_balance: Some(record(200, "www", "5.6.7.8", load_balance)),
    }
}
