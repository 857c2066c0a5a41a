// # Pushcat Notifier
//
// Sends switch notifications through the Pushcat message API.
//
// Every message is delivered to each configured access token in turn:
//
// ```http
// POST /openapi/v1/message/send
// Authorization: Bearer <token>
// Content-Type: application/json
//
// {"title": "...", "content": "..."}
// ```
//
// A non-200 response (its body becomes the error message) or a transport
// error fails the send. All tokens are still attempted, and the first error
// is returned. With no tokens configured, sending is a no-op.

use async_trait::async_trait;
use dnswatch_core::config::NotifyConfig;
use dnswatch_core::traits::{Notifier, NotifierFactory};
use dnswatch_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// Pushcat message endpoint
pub const DEFAULT_ENDPOINT: &str = "https://sct.icodef.com/openapi/v1/message/send";

/// Default HTTP timeout for a single send
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const NOTIFIER: &str = "pushcat";

/// Request body
#[derive(Debug, Serialize)]
struct Message<'a> {
    title: &'a str,
    content: &'a str,
}

/// Pushcat notifier
pub struct PushcatNotifier {
    /// ⚠️ NEVER log these values
    access_tokens: Vec<String>,
    endpoint: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the access tokens
impl std::fmt::Debug for PushcatNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushcatNotifier")
            .field("access_tokens", &format!("<{} REDACTED>", self.access_tokens.len()))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl PushcatNotifier {
    /// Create a notifier sending to `endpoint` (or the public Pushcat API)
    pub fn new(access_tokens: Vec<String>, endpoint: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            access_tokens,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            client,
        })
    }

    /// Number of destinations each message goes to
    pub fn destination_count(&self) -> usize {
        self.access_tokens.len()
    }

    async fn send_to(&self, token: &str, message: &Message<'_>) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(message)
            .send()
            .await
            .map_err(|e| Error::notifier(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        if status != reqwest::StatusCode::OK {
            return Err(Error::notifier(format!("{} - {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for PushcatNotifier {
    async fn send(&self, title: &str, content: &str) -> Result<()> {
        let message = Message { title, content };

        let mut first_error = None;
        for (index, token) in self.access_tokens.iter().enumerate() {
            match self.send_to(token, &message).await {
                Ok(()) => tracing::debug!(destination = index, "Notification delivered"),
                Err(e) => {
                    tracing::warn!(destination = index, error = %e, "Notification delivery failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn notifier_name(&self) -> &'static str {
        NOTIFIER
    }
}

/// Factory for creating Pushcat notifiers
pub struct PushcatFactory;

impl NotifierFactory for PushcatFactory {
    fn create(&self, config: &NotifyConfig) -> Result<Box<dyn Notifier>> {
        if config.kind != NOTIFIER {
            return Err(Error::config(format!(
                "Invalid config for Pushcat notifier: type {}",
                config.kind
            )));
        }
        if config.access_tokens.is_empty() {
            tracing::warn!("No Pushcat access tokens configured, notifications are disabled");
        }

        Ok(Box::new(PushcatNotifier::new(
            config.access_tokens.clone(),
            config.endpoint.clone(),
        )?))
    }
}

/// Register the Pushcat notifier with a registry
pub fn register(registry: &dnswatch_core::ProviderRegistry) {
    registry.register_notifier(NOTIFIER, Box::new(PushcatFactory));
}
