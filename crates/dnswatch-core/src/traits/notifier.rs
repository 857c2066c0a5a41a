// # Notifier Trait
//
// Defines the interface for alerting operators when a record is switched.
//
// ## Implementations
//
// - Pushcat: `dnswatch-notify-pushcat` crate

use async_trait::async_trait;

/// Trait for notification channels
///
/// One instance is shared by every record controller, so implementations
/// must be safe for concurrent use without coordination.
///
/// Notifications are a side channel: a failed send is logged by the caller
/// and never retried, and never affects gate state.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message to every configured destination
    ///
    /// # Parameters
    ///
    /// - `title`: Short human-readable title
    /// - `content`: Message body
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Every destination accepted the message
    /// - `Err(Error)`: At least one destination failed (others may still
    ///   have received it)
    async fn send(&self, title: &str, content: &str) -> Result<(), crate::Error>;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifyConfig,
    ) -> Result<Box<dyn Notifier>, crate::Error>;
}
