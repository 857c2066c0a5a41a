//! Configuration types for the dnswatch system
//!
//! This module defines all configuration structures used throughout the crate.
//! The on-disk format is JSON; field names follow the camelCase keys operators
//! already use (`secretID`, `checkDomain`, `loadBalance`, ...).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::gate::GatePolicy;

/// Longest accepted probe interval (one day)
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Main dnswatch configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Provider credential ID
    #[serde(rename = "secretID", default)]
    pub secret_id: String,

    /// Provider credential secret
    /// ⚠️ NEVER log this value
    #[serde(rename = "secretKey", default)]
    pub secret_key: String,

    /// DNS provider type name (as registered in the registry)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// DNS records to watch
    #[serde(rename = "checkDomain", default)]
    pub check_domain: Vec<WatchedDomain>,

    /// Notification channel settings
    #[serde(default, alias = "pushcat")]
    pub notify: NotifyConfig,

    /// Watch loop tuning
    #[serde(default)]
    pub watch: WatchSettings,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for WatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchConfig")
            .field("secret_id", &"<REDACTED>")
            .field("secret_key", &"<REDACTED>")
            .field("provider", &self.provider)
            .field("check_domain", &self.check_domain)
            .field("notify", &self.notify)
            .field("watch", &self.watch)
            .finish()
    }
}

impl WatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            secret_id: String::new(),
            secret_key: String::new(),
            provider: default_provider(),
            check_domain: Vec::new(),
            notify: NotifyConfig::default(),
            watch: WatchSettings::default(),
        }
    }

    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.secret_id.is_empty() || self.secret_key.is_empty() {
            return Err(crate::Error::config("secretID and secretKey are required"));
        }

        if self.provider.is_empty() {
            return Err(crate::Error::config("Provider type cannot be empty"));
        }

        if self.check_domain.is_empty() {
            return Err(crate::Error::config("No records configured in checkDomain"));
        }

        for watched in &self.check_domain {
            watched.validate()?;
        }

        self.notify.validate()?;
        self.watch.validate()?;

        Ok(())
    }

    /// Provider settings handed to the provider factory
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            kind: self.provider.clone(),
            secret_id: self.secret_id.clone(),
            secret_key: self.secret_key.clone(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_provider() -> String {
    "dnspod".to_string()
}

/// One DNS record to monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedDomain {
    /// Zone the record lives in (e.g., "example.com")
    pub domain: String,

    /// Record name inside the zone (e.g., "www" or "@")
    #[serde(rename = "name")]
    pub record_name: String,

    /// Record value; also the probe target
    pub value: String,

    /// Provider routing line, if the same name/value exists on several lines
    #[serde(rename = "line", default, skip_serializing_if = "Option::is_none")]
    pub routing_line: Option<String>,

    /// Secondary record promoted while the primary is slow
    #[serde(rename = "loadBalance", default, skip_serializing_if = "Option::is_none")]
    pub load_balance: Option<LoadBalanceConfig>,
}

impl WatchedDomain {
    /// Create a new watched record
    pub fn new(
        domain: impl Into<String>,
        record_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            record_name: record_name.into(),
            value: value.into(),
            routing_line: None,
            load_balance: None,
        }
    }

    /// Restrict the lookup to a routing line
    pub fn with_routing_line(mut self, line: impl Into<String>) -> Self {
        self.routing_line = Some(line.into());
        self
    }

    /// Pair the record with a load-balance record
    pub fn with_load_balance(mut self, load_balance: LoadBalanceConfig) -> Self {
        self.load_balance = Some(load_balance);
        self
    }

    /// Validate a single entry
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.is_empty() {
            return Err(crate::Error::config("checkDomain entry has an empty domain"));
        }
        if self.record_name.is_empty() {
            return Err(crate::Error::config(format!(
                "checkDomain entry for {} has an empty name",
                self.domain
            )));
        }
        if self.value.is_empty() {
            return Err(crate::Error::config(format!(
                "checkDomain entry {}.{} has an empty value",
                self.record_name, self.domain
            )));
        }
        if let Some(ref lb) = self.load_balance {
            if lb.value.is_empty() {
                return Err(crate::Error::config(format!(
                    "loadBalance for {}.{} has an empty value",
                    self.record_name, self.domain
                )));
            }
            if lb.value == self.value && lb.routing_line == self.routing_line {
                return Err(crate::Error::config(format!(
                    "loadBalance for {}.{} points at the primary record itself",
                    self.record_name, self.domain
                )));
            }
        }
        Ok(())
    }
}

/// Load-balance pairing for a watched record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalanceConfig {
    /// Value of the secondary record (same name, same zone)
    pub value: String,

    /// Routing line of the secondary record
    #[serde(rename = "line", default, skip_serializing_if = "Option::is_none")]
    pub routing_line: Option<String>,
}

impl LoadBalanceConfig {
    /// Create a new load-balance pairing
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            routing_line: None,
        }
    }
}

/// Provider settings passed to a [`crate::traits::DnsProviderFactory`]
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider type name
    pub kind: String,
    /// Credential ID
    pub secret_id: String,
    /// Credential secret
    pub secret_key: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("secret_id", &"<REDACTED>")
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

/// Notification channel configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Notifier type name (as registered in the registry)
    #[serde(rename = "type", default = "default_notifier")]
    pub kind: String,

    /// Destination tokens; each one receives every message
    #[serde(rename = "accessToken", default)]
    pub access_tokens: Vec<String>,

    /// Override for the notifier endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("kind", &self.kind)
            .field("access_tokens", &format!("<{} REDACTED>", self.access_tokens.len()))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl NotifyConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.kind.is_empty() {
            return Err(crate::Error::config("Notifier type cannot be empty"));
        }
        if self.access_tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(crate::Error::config("Notifier access tokens cannot be empty"));
        }
        if let Some(ref endpoint) = self.endpoint
            && !endpoint.starts_with("https://")
            && !endpoint.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "Notifier endpoint must use HTTP or HTTPS scheme. Got: {}",
                endpoint
            )));
        }
        Ok(())
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            kind: default_notifier(),
            access_tokens: Vec::new(),
            endpoint: None,
        }
    }
}

fn default_notifier() -> String {
    "pushcat".to_string()
}

/// Watch loop tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSettings {
    /// Seconds between two probes of the same record
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Consecutive identical observations that must be exceeded before a flip
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Minimum seconds between a transition and the next automatic recovery
    ///
    /// Set to 0 to let recoveries happen as soon as the threshold is exceeded.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Probe latency above which the load-balance record is promoted
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: u64,

    /// TCP port probed on each record value
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    /// Connect timeout of a single probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Capacity of the watch event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl WatchSettings {
    /// Validate the tuning values
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("watch.intervalSecs must be > 0"));
        }
        if self.interval_secs > MAX_INTERVAL_SECS {
            return Err(crate::Error::config(format!(
                "watch.intervalSecs must be <= {}",
                MAX_INTERVAL_SECS
            )));
        }
        if self.threshold == 0 {
            return Err(crate::Error::config("watch.threshold must be > 0"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(crate::Error::config("watch.probeTimeoutSecs must be > 0"));
        }
        if self.probe_port == 0 {
            return Err(crate::Error::config("watch.probePort must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("watch.eventChannelCapacity must be > 0"));
        }
        Ok(())
    }

    /// Probe interval as a [`Duration`], capped at [`MAX_INTERVAL_SECS`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.min(MAX_INTERVAL_SECS))
    }

    /// Latency threshold as a [`Duration`]
    pub fn latency_threshold(&self) -> Duration {
        Duration::from_millis(self.latency_threshold_ms)
    }

    /// Probe connect timeout as a [`Duration`]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Gate policy built from these settings
    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy::new(self.threshold, Duration::from_secs(self.cooldown_secs))
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            threshold: default_threshold(),
            cooldown_secs: default_cooldown_secs(),
            latency_threshold_ms: default_latency_threshold_ms(),
            probe_port: default_probe_port(),
            probe_timeout_secs: default_probe_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    1
}

fn default_threshold() -> usize {
    3
}

fn default_cooldown_secs() -> u64 {
    60 * 60
}

fn default_latency_threshold_ms() -> u64 {
    100
}

fn default_probe_port() -> u16 {
    80
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    1000
}
