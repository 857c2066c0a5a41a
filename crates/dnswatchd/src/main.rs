// # dnswatchd - DNS failover daemon
//
// This daemon is a thin integration layer. All watch logic lives in
// dnswatch-core; the daemon only:
// 1. Reads its settings from environment variables
// 2. Loads and validates the JSON watch configuration
// 3. Registers the provider and notifier implementations
// 4. Starts one watch task per configured record
// 5. Stops every task on SIGTERM/SIGINT
//
// ## Configuration
//
// - `DNSWATCH_CONFIG`: Path of the JSON configuration (default: config.json)
// - `DNSWATCH_SECRET_ID`: Provider credential ID, overrides `secretID`
// - `DNSWATCH_SECRET_KEY`: Provider credential secret, overrides `secretKey`
// - `DNSWATCH_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
// - `DNSWATCH_MODE`: `dry-run` to list records without changing them
//
// ## Credentials
//
// `secretID`/`secretKey` are a DNSPod API token pair (the token ID and the
// token itself, sent as `login_token=<id>,<token>`). Tencent Cloud CAM
// SecretId/SecretKey pairs for API 3.0 are NOT accepted; with those the first
// `Record.List` fails with an authentication error and startup aborts.
//
// ## Example
//
// ```bash
// export DNSWATCH_CONFIG=/etc/dnswatch/config.json
// export DNSWATCH_SECRET_ID=12345
// export DNSWATCH_SECRET_KEY=your_token
//
// dnswatchd
// ```
//
// ```json
// {
//   "checkDomain": [
//     {"domain": "example.com", "name": "www", "value": "1.2.3.4",
//      "loadBalance": {"value": "5.6.7.8"}}
//   ],
//   "notify": {"accessToken": ["pushcat-token"]}
// }
// ```

use anyhow::{Context, Result};
use dnswatch_core::{
    CancellationToken, DnsProvider, Notifier, Prober, ProviderRegistry, TcpProber, WatchConfig,
    WatchEvent, WatchHandle, WatchSupervisor,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long stopped watch tasks may take to finish
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum WatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<WatchExitCode> for ExitCode {
    fn from(code: WatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings read from the environment
#[derive(Debug)]
struct DaemonConfig {
    config_path: PathBuf,
    secret_id: Option<String>,
    secret_key: Option<String>,
    log_level: String,
    mode: String,
}

impl DaemonConfig {
    /// Load daemon settings from environment variables
    fn from_env() -> Self {
        Self {
            config_path: env::var("DNSWATCH_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.json")),
            secret_id: env::var("DNSWATCH_SECRET_ID").ok().filter(|s| !s.is_empty()),
            secret_key: env::var("DNSWATCH_SECRET_KEY").ok().filter(|s| !s.is_empty()),
            log_level: env::var("DNSWATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            mode: env::var("DNSWATCH_MODE").unwrap_or_default(),
        }
    }

    /// Validate the daemon settings
    fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        match self.mode.to_lowercase().as_str() {
            "" | "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "DNSWATCH_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        Ok(())
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn is_dry_run(&self) -> bool {
        self.mode.eq_ignore_ascii_case("dry-run")
    }

    /// Load the watch configuration and apply environment overrides
    fn load_watch_config(&self) -> Result<WatchConfig> {
        let mut config = WatchConfig::from_file(&self.config_path)
            .with_context(|| format!("Failed to load {}", self.config_path.display()))?;

        if let Some(ref id) = self.secret_id {
            config.secret_id = id.clone();
        }
        if let Some(ref key) = self.secret_key {
            config.secret_key = key.clone();
        }

        config.validate().context("Invalid watch configuration")?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let daemon = DaemonConfig::from_env();

    if let Err(e) = daemon.validate() {
        eprintln!("Configuration validation error: {}", e);
        return WatchExitCode::ConfigError.into();
    }

    let config = match daemon.load_watch_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return WatchExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(daemon.level()).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return WatchExitCode::ConfigError.into();
    }

    info!("Starting dnswatchd daemon");
    info!(
        "Configuration loaded from {}: {} record(s)",
        daemon.config_path.display(),
        config.check_domain.len()
    );
    if daemon.is_dry_run() {
        warn!("DRY-RUN mode: records are looked up but never changed");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return WatchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (handle, events, shutdown) = match start(config).await {
            Ok(started) => started,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return WatchExitCode::ConfigError;
            }
        };

        match supervise(handle, events, shutdown).await {
            Ok(()) => WatchExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                WatchExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Build the components and start one watch task per record
///
/// Any failure here (unknown provider, unresolvable record) is fatal.
async fn start(config: WatchConfig) -> Result<(WatchHandle, JoinHandle<()>, CancellationToken)> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "dnspod")]
    {
        info!("Registering DNSPod provider");
        dnswatch_provider_dnspod::register(&registry);
    }

    #[cfg(feature = "pushcat")]
    {
        info!("Registering Pushcat notifier");
        dnswatch_notify_pushcat::register(&registry);
    }

    let provider: Arc<dyn DnsProvider> = registry
        .create_provider(&config.provider_config())
        .context("Failed to create DNS provider")?
        .into();
    let notifier: Arc<dyn Notifier> = registry
        .create_notifier(&config.notify)
        .context("Failed to create notifier")?
        .into();
    let prober: Arc<dyn Prober> = Arc::new(TcpProber::new(
        config.watch.probe_port,
        config.watch.probe_timeout(),
    ));

    info!("Provider type: {}", provider.provider_name());
    info!("Notifier type: {}", notifier.notifier_name());
    info!(
        "Probing TCP port {} every {}s",
        config.watch.probe_port, config.watch.interval_secs
    );

    let (supervisor, event_rx) = WatchSupervisor::new(config, provider, notifier, prober)?;

    let shutdown = CancellationToken::new();
    let handle = supervisor
        .start(shutdown.clone())
        .await
        .context("Failed to resolve watched records")?;

    let events = tokio::spawn(log_events(event_rx));

    Ok((handle, events, shutdown))
}

/// Wait for a shutdown signal, then stop every watch task
async fn supervise(
    handle: WatchHandle,
    events: JoinHandle<()>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Daemon initialized successfully, watching {} record(s)", handle.len());

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    shutdown.cancel();

    tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.join())
        .await
        .map_err(|_| anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT))??;

    // Every sender is gone once the tasks have stopped
    events.await.context("Event logger failed")?;

    info!("All watch tasks stopped");
    Ok(())
}

/// Log watch events until every controller has stopped
async fn log_events(mut events: mpsc::Receiver<WatchEvent>) {
    while let Some(event) = events.recv().await {
        debug!(domain = event.domain(), ?event, "Watch event");
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// The name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "secretID": "file-id",
        "secretKey": "file-key",
        "checkDomain": [
            {"domain": "example.com", "name": "www", "value": "1.2.3.4"}
        ]
    }"#;

    fn daemon(path: PathBuf) -> DaemonConfig {
        DaemonConfig {
            config_path: path,
            secret_id: None,
            secret_key: None,
            log_level: "info".to_string(),
            mode: String::new(),
        }
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_watch_config() {
        let file = config_file(CONFIG);
        let config = daemon(file.path().to_path_buf()).load_watch_config().unwrap();

        assert_eq!(config.secret_id, "file-id");
        assert_eq!(config.check_domain.len(), 1);
        assert_eq!(config.provider, "dnspod");
    }

    #[test]
    fn test_env_credentials_override_file() {
        let file = config_file(CONFIG);
        let mut daemon = daemon(file.path().to_path_buf());
        daemon.secret_id = Some("env-id".to_string());
        daemon.secret_key = Some("env-key".to_string());

        let config = daemon.load_watch_config().unwrap();
        assert_eq!(config.secret_id, "env-id");
        assert_eq!(config.secret_key, "env-key");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let file = config_file(r#"{"checkDomain": [{"domain": "example.com", "name": "www", "value": "1.2.3.4"}]}"#);
        assert!(daemon(file.path().to_path_buf()).load_watch_config().is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = daemon(PathBuf::from("/nonexistent/dnswatch.json"))
            .load_watch_config()
            .unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/dnswatch.json"));
    }

    #[test]
    fn test_log_level_validation() {
        let mut daemon = daemon(PathBuf::from("config.json"));
        assert!(daemon.validate().is_ok());

        daemon.log_level = "DEBUG".to_string();
        assert!(daemon.validate().is_ok());
        assert_eq!(daemon.level(), Level::DEBUG);

        daemon.log_level = "verbose".to_string();
        assert!(daemon.validate().is_err());
    }

    #[test]
    fn test_mode_validation() {
        let mut daemon = daemon(PathBuf::from("config.json"));
        daemon.mode = "dry-run".to_string();
        assert!(daemon.validate().is_ok());
        assert!(daemon.is_dry_run());

        daemon.mode = "yolo".to_string();
        assert!(daemon.validate().is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(WatchExitCode::CleanShutdown as u8, 0);
        assert_eq!(WatchExitCode::ConfigError as u8, 1);
        assert_eq!(WatchExitCode::RuntimeError as u8, 2);
    }
}
