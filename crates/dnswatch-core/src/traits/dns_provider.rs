// # DNS Provider Trait
//
// Defines the interface for reading DNS records and switching their status
// via provider APIs.
//
// ## Implementations
//
// - DNSPod: `dnswatch-provider-dnspod` crate
//
// ## Usage
//
// ```rust,ignore
// use dnswatch_core::{DnsProvider, RecordStatus};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.list_records("example.com").await?;
//     provider
//         .set_record_status("example.com", records[0].id, RecordStatus::Disabled)
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serving status of a DNS record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    /// Record is served
    Enabled,
    /// Record is withdrawn
    Disabled,
}

impl RecordStatus {
    /// `true` for [`RecordStatus::Enabled`]
    pub fn is_enabled(self) -> bool {
        matches!(self, RecordStatus::Enabled)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Enabled => f.write_str("ENABLE"),
            RecordStatus::Disabled => f.write_str("DISABLE"),
        }
    }
}

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Stable provider-side record ID
    pub id: u64,
    /// Record name inside the zone (e.g., "www" or "@")
    pub name: String,
    /// Record value (IP address or hostname)
    pub value: String,
    /// Routing line the record is served on
    pub line: String,
    /// Current serving status
    pub status: RecordStatus,
}

impl DnsRecord {
    /// Whether this record matches a configured name, value and optional line
    pub fn matches(&self, name: &str, value: &str, line: Option<&str>) -> bool {
        if self.name != name || self.value != value {
            return false;
        }
        match line {
            Some(line) if !line.is_empty() => self.line == line,
            _ => true,
        }
    }
}

/// Trait for DNS provider implementations
///
/// This trait defines the two calls the watcher needs: one lookup at startup
/// and status switches from the watch loops.
///
/// # Thread Safety
///
/// Implementations must be thread-safe. A single instance is shared by every
/// record controller.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads (violates shutdown determinism)
/// - ❌ Implement retry logic or backoff (the hysteresis gate re-attempts on
///   the next qualifying probe)
/// - ❌ Cache record state between calls
/// - ❌ Decide whether a record should be switched (owned by the controller)
///
/// A failed call is reported as an error and nothing else. The caller keeps
/// its gate un-transitioned, so the switch is attempted again on a later
/// tick.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record of a zone
    ///
    /// # Parameters
    ///
    /// - `domain`: The zone name (e.g., "example.com")
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: All records of the zone
    /// - `Err(Error)`: If the request failed
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Set the serving status of a record
    ///
    /// # Idempotency
    ///
    /// Setting a record to the status it already has must succeed.
    ///
    /// # Parameters
    ///
    /// - `domain`: The zone name
    /// - `record_id`: Provider record ID from [`DnsProvider::list_records`]
    /// - `status`: Requested status
    async fn set_record_status(
        &self,
        domain: &str,
        record_id: u64,
        status: RecordStatus,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
