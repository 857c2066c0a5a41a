//! Plugin-based provider registry
//!
//! The registry allows DNS providers and notifiers to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnswatch_core::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! dnswatch_provider_dnspod::register(&registry);
//! dnswatch_notify_pushcat::register(&registry);
//!
//! let provider = registry.create_provider(&config.provider_config())?;
//! let notifier = registry.create_notifier(&config.notify)?;
//! ```

use crate::config::{NotifyConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, Notifier, NotifierFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of provider and notifier factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "dnspod")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name.into(), factory);
    }

    /// Register a notifier factory
    ///
    /// # Parameters
    ///
    /// - `name`: Notifier type name (e.g., "pushcat")
    /// - `factory`: Factory object for creating notifier instances
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        let mut notifiers = self
            .notifiers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        notifiers.insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = providers
            .get(&config.kind)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", config.kind)))?;

        factory.create(config)
    }

    /// Create a notifier from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Notifier>)`: Created notifier instance
    /// - `Err(Error)`: If notifier type is not registered or creation fails
    pub fn create_notifier(&self, config: &NotifyConfig) -> Result<Box<dyn Notifier>> {
        let notifiers = self
            .notifiers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = notifiers
            .get(&config.kind)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", config.kind)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        let notifiers = self
            .notifiers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        notifiers.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        let notifiers = self
            .notifiers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        notifiers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProviderFactory;

    impl DnsProviderFactory for MockProviderFactory {
        fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
            Err(Error::not_found("Mock provider not implemented"))
        }
    }

    struct MockNotifierFactory;

    impl NotifierFactory for MockNotifierFactory {
        fn create(&self, _config: &NotifyConfig) -> Result<Box<dyn Notifier>> {
            Err(Error::not_found("Mock notifier not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ProviderRegistry::new();

        assert!(!registry.has_provider("mock"));
        assert!(!registry.has_notifier("mock"));

        registry.register_provider("mock", Box::new(MockProviderFactory));
        registry.register_notifier("mock", Box::new(MockNotifierFactory));

        assert!(registry.has_provider("mock"));
        assert!(registry.has_notifier("mock"));
        assert!(registry.list_providers().contains(&"mock".to_string()));
        assert!(registry.list_notifiers().contains(&"mock".to_string()));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let registry = ProviderRegistry::new();
        let config = ProviderConfig {
            kind: "route53".to_string(),
            secret_id: "id".to_string(),
            secret_key: "key".to_string(),
        };

        let result = registry.create_provider(&config);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_factory_error_is_propagated() {
        let registry = ProviderRegistry::new();
        registry.register_notifier("pushcat", Box::new(MockNotifierFactory));

        let result = registry.create_notifier(&NotifyConfig::default());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
