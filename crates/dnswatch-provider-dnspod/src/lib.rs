// # DNSPod DNS Provider
//
// This crate provides a DNSPod implementation of `DnsProvider` for dnswatch.
//
// ## Behaviour
//
// - One HTTP request per call (plus paging for very large zones)
// - Full error propagation; re-attempts are owned by the hysteresis gate
// - HTTP timeout configured (30 seconds)
// - Dry-run mode: lookups are performed, status changes are only logged
// - ❌ NO retry logic
// - ❌ NO caching of record state
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - The credentials NEVER appear in logs or Debug output
// - The provider fails fast if either credential is empty
//
// ## API Reference
//
// DNSPod legacy API (https://docs.dnspod.cn/api/). Every call is a form POST
// to `https://dnsapi.cn/<Action>` carrying `login_token=<id>,<token>` and
// `format=json`. The response carries `status.code`; `"1"` means success.
//
// - List records: `Record.List` (domain, offset, length)
// - Switch a record: `Record.Status` (domain, record_id, status=enable|disable)
//
// The credentials are a DNSPod token ID and token. Tencent Cloud CAM keys
// (API 3.0 `DescribeRecordList`/`ModifyRecordStatus`) are not supported and
// are rejected by the legacy API as a login failure.

use async_trait::async_trait;
use dnswatch_core::config::ProviderConfig;
use dnswatch_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, RecordStatus};
use dnswatch_core::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

/// DNSPod API base URL
const DNSPOD_API_BASE: &str = "https://dnsapi.cn";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest page `Record.List` returns
const PAGE_SIZE: usize = 3000;

/// Provider name used in errors and logs
const PROVIDER: &str = "dnspod";

/// DNSPod API failures, folded into [`Error::Provider`] at the boundary
#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("DNSPod server error (transient): {status} - {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected HTTP status: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Authentication failed: check secretID and secretKey ({message})")]
    Auth { message: String },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Invalid record in response: {0}")]
    Record(String),
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Error::provider(PROVIDER, e.to_string())
    }
}

/// `status` object present in every DNSPod response
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(deserialize_with = "string_or_number")]
    code: String,
    #[serde(default)]
    message: String,
}

impl ApiStatus {
    fn into_result(self) -> std::result::Result<(), ApiError> {
        match self.code.as_str() {
            "1" => Ok(()),
            // -1: login failed, -8: login failed too many times
            "-1" | "-8" => Err(ApiError::Auth {
                message: self.message,
            }),
            _ => Err(ApiError::Api {
                code: self.code,
                message: self.message,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: ApiStatus,
}

#[derive(Debug, Deserialize)]
struct RecordListResponse {
    status: ApiStatus,
    #[serde(default)]
    info: Option<RecordListInfo>,
    #[serde(default)]
    records: Vec<ApiRecord>,
}

#[derive(Debug, Deserialize)]
struct RecordListInfo {
    /// Records in the whole zone; `records_num` only counts this page
    #[serde(default, deserialize_with = "optional_string_or_number")]
    record_total: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    name: String,
    value: String,
    #[serde(default)]
    line: String,
    #[serde(deserialize_with = "string_or_number")]
    enabled: String,
}

impl TryFrom<ApiRecord> for DnsRecord {
    type Error = ApiError;

    fn try_from(r: ApiRecord) -> std::result::Result<Self, Self::Error> {
        let id = r
            .id
            .parse()
            .map_err(|_| ApiError::Record(format!("record id {:?} is not numeric", r.id)))?;
        let status = match r.enabled.as_str() {
            "1" => RecordStatus::Enabled,
            "0" => RecordStatus::Disabled,
            other => {
                return Err(ApiError::Record(format!(
                    "record {} has unknown enabled flag {:?}",
                    id, other
                )));
            }
        };
        Ok(DnsRecord {
            id,
            name: r.name,
            value: r.value,
            line: r.line,
            status,
        })
    }
}

// DNSPod returns most numbers as strings, but not consistently
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Parse one page of `Record.List`
///
/// Returns the records of the page and the zone's total record count.
fn parse_record_page(body: &str) -> std::result::Result<(Vec<DnsRecord>, Option<usize>), ApiError> {
    let response: RecordListResponse = serde_json::from_str(body)?;
    response.status.into_result()?;

    let total = response
        .info
        .and_then(|info| info.record_total)
        .and_then(|n| n.parse().ok());
    let records = response
        .records
        .into_iter()
        .map(DnsRecord::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((records, total))
}

/// Parse a response that only carries a status
fn parse_status(body: &str) -> std::result::Result<(), ApiError> {
    let response: StatusResponse = serde_json::from_str(body)?;
    response.status.into_result()
}

/// `Record.Status` value for a record status
fn status_param(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Enabled => "enable",
        RecordStatus::Disabled => "disable",
    }
}

/// DNSPod DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform `Record.List` lookups
/// - Log the intended `Record.Status` call
/// - **NOT** actually change any record
///
/// # Security
///
/// The Debug implementation does NOT expose the credentials.
pub struct DnspodProvider {
    /// `<secretID>,<secretKey>`
    /// ⚠️ NEVER log this value
    login_token: String,

    /// API base URL, overridable for tests
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, list records but skip status changes
    dry_run: bool,
}

// Custom Debug implementation that hides the login token
impl std::fmt::Debug for DnspodProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnspodProvider")
            .field("login_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DnspodProvider {
    /// Create a new DNSPod provider
    ///
    /// # Parameters
    ///
    /// - `secret_id`: DNSPod API token ID
    /// - `secret_key`: DNSPod API token
    /// - `dry_run`: If true, list records but skip status changes
    ///
    /// # Errors
    ///
    /// Fails if either credential is empty or the HTTP client cannot be built.
    pub fn new(secret_id: &str, secret_key: &str, dry_run: bool) -> Result<Self> {
        if secret_id.is_empty() || secret_key.is_empty() {
            return Err(Error::config("DNSPod secretID and secretKey are required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!("dnswatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            login_token: format!("{},{}", secret_id, secret_key),
            api_base: DNSPOD_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Send requests to another API base (e.g., a local test server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether status changes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// POST one API action and return the raw response body
    ///
    /// ```http
    /// POST /<action>
    /// Content-Type: application/x-www-form-urlencoded
    ///
    /// login_token=<id>,<token>&format=json&lang=en&...
    /// ```
    async fn call(&self, action: &str, params: &[(&str, &str)]) -> std::result::Result<String, ApiError> {
        let url = format!("{}/{}", self.api_base, action);

        let mut form: Vec<(&str, &str)> = vec![
            ("login_token", self.login_token.as_str()),
            ("format", "json"),
            ("lang", "en"),
            ("error_on_empty", "no"),
        ];
        form.extend_from_slice(params);

        let response = self.client.post(&url).form(&form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match status.as_u16() {
                500..=599 => ApiError::Server {
                    status: status.as_u16(),
                    body,
                },
                code => ApiError::Status { status: code, body },
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl DnsProvider for DnspodProvider {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        tracing::debug!(domain, "Listing DNSPod records");

        let length = PAGE_SIZE.to_string();
        let mut records = Vec::new();
        loop {
            let offset = records.len().to_string();
            let body = self
                .call(
                    "Record.List",
                    &[
                        ("domain", domain),
                        ("offset", offset.as_str()),
                        ("length", length.as_str()),
                    ],
                )
                .await?;
            let (page, total) = parse_record_page(&body)?;

            let page_len = page.len();
            records.extend(page);

            let more = total.is_some_and(|total| records.len() < total);
            if page_len == 0 || !more {
                break;
            }
        }

        tracing::debug!(domain, count = records.len(), "Listed DNSPod records");
        Ok(records)
    }

    async fn set_record_status(
        &self,
        domain: &str,
        record_id: u64,
        status: RecordStatus,
    ) -> Result<()> {
        let record_id_param = record_id.to_string();
        let params = [
            ("domain", domain),
            ("record_id", record_id_param.as_str()),
            ("status", status_param(status)),
        ];

        if self.dry_run {
            tracing::info!(
                domain,
                record_id,
                %status,
                "[DRY-RUN] Would call Record.Status"
            );
            return Ok(());
        }

        tracing::debug!(domain, record_id, %status, "Calling Record.Status");
        let body = self.call("Record.Status", &params).await?;
        parse_status(&body)?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating DNSPod providers
pub struct DnspodFactory;

impl DnsProviderFactory for DnspodFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        if config.kind != PROVIDER {
            return Err(Error::config(format!(
                "Invalid config for DNSPod provider: type {}",
                config.kind
            )));
        }

        // Check for dry-run mode environment variable
        let dry_run = std::env::var("DNSWATCH_MODE")
            .unwrap_or_default()
            .eq_ignore_ascii_case("dry-run");

        if dry_run {
            tracing::warn!("DNSPod provider running in DRY-RUN mode - no records will be changed");
        }

        Ok(Box::new(DnspodProvider::new(
            &config.secret_id,
            &config.secret_key,
            dry_run,
        )?))
    }
}

/// Register the DNSPod provider with a registry
///
/// # Example
///
/// ```rust
/// use dnswatch_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dnswatch_provider_dnspod::register(&registry);
/// assert!(registry.has_provider("dnspod"));
/// ```
pub fn register(registry: &dnswatch_core::ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(DnspodFactory));
}
