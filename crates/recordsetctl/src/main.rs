// # recordsetctl - DNS record set controller CLI
//
// A THIN integration layer over recordset-core. All lifecycle logic (waiting,
// drift detection, idempotent delete) lives in the library; this binary only
// reads configuration, builds a control-plane client and prints results.
//
// ## Configuration
//
// Connection settings come from environment variables only:
//
// - `RECORDSET_ENDPOINT`: Base URL of the DNS v2 API (required)
// - `RECORDSET_AUTH_TOKEN`: Token sent as X-Auth-Token (required)
// - `RECORDSET_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `RECORDSET_POLL_INTERVAL_MS`: Delay between consistency probes (default: 3000)
// - `RECORDSET_CREATE_TIMEOUT`, `RECORDSET_UPDATE_TIMEOUT`, `RECORDSET_DELETE_TIMEOUT`:
//   Per-operation bounds such as `5m` or `90s` (default: 10m)
//
// Desired state is read from a JSON file:
//
// ```json
// {"zone_id": "...", "name": "www.example.com.", "type": "A",
//  "records": ["10.1.0.0"], "ttl": 3000, "description": "a record set"}
// ```
//
// ## Example
//
// ```bash
// export RECORDSET_ENDPOINT=https://dns.example.net:9001
// export RECORDSET_AUTH_TOKEN=...
//
// recordsetctl create www.json          # prints attributes including "token"
// recordsetctl update <token> www.json
// recordsetctl delete <token>
// recordsetctl check-destroyed <token>  # exit 3 if it still exists
// ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recordset_core::config::parse_duration;
use recordset_core::{
    ControlPlaneClient, Error as CoreError, ExistenceVerifier, Observed, OperationContext,
    Reconciler, ReconcilerConfig, RecordSet, RecordSetSpec, ResourceTimeouts,
};
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CtlExitCode {
    /// Operation completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Operation failed
    RuntimeError = 2,
    /// check-destroyed found the record set still present
    DestroyCheckFailed = 3,
}

impl From<CtlExitCode> for ExitCode {
    fn from(code: CtlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "recordsetctl", version, about = "Manage DNS record sets on a DNS v2 control plane")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a record set from a JSON spec and wait until it is active
    Create {
        /// Path to the desired-state JSON file
        spec: PathBuf,
    },
    /// Show the current state of a managed record set
    Read {
        /// Identifier returned by create (`<zone_id>/<record_id>`)
        token: String,
    },
    /// Bring a record set in line with a JSON spec
    Update {
        token: String,
        spec: PathBuf,
    },
    /// Delete a record set and wait until it is gone
    Delete { token: String },
    /// Fail with exit code 3 if the record set still exists
    CheckDestroyed { token: String },
}

/// Result of a successful command
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    StillPresent,
}

/// Application configuration
#[derive(Debug)]
struct Config {
    endpoint: String,
    auth_token: String,
    log_level: String,
    poll_interval_ms: Option<String>,
    create_timeout: Option<String>,
    update_timeout: Option<String>,
    delete_timeout: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            endpoint: get("RECORDSET_ENDPOINT").unwrap_or_default(),
            auth_token: get("RECORDSET_AUTH_TOKEN").unwrap_or_default(),
            log_level: get("RECORDSET_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            poll_interval_ms: get("RECORDSET_POLL_INTERVAL_MS"),
            create_timeout: get("RECORDSET_CREATE_TIMEOUT"),
            update_timeout: get("RECORDSET_UPDATE_TIMEOUT"),
            delete_timeout: get("RECORDSET_DELETE_TIMEOUT"),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            anyhow::bail!(
                "RECORDSET_ENDPOINT is required. \
                Set it via: export RECORDSET_ENDPOINT=https://dns.example.net:9001"
            );
        }

        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            anyhow::bail!(
                "RECORDSET_ENDPOINT must use HTTP or HTTPS scheme. Got: {}",
                self.endpoint
            );
        }

        if self.auth_token.is_empty() {
            anyhow::bail!("RECORDSET_AUTH_TOKEN is required");
        }

        let token_lower = self.auth_token.to_lowercase();
        if token_lower.contains("your_token") || token_lower.contains("replace_me") {
            anyhow::bail!(
                "RECORDSET_AUTH_TOKEN appears to be a placeholder. \
                Use an actual token from your identity service."
            );
        }

        self.poll_interval()?;
        self.log_level()?;
        self.reconciler_config()?;

        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "RECORDSET_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        })
    }

    /// Process-wide timeouts and poll interval
    fn poll_interval(&self) -> Result<Option<Duration>> {
        let Some(raw) = &self.poll_interval_ms else {
            return Ok(None);
        };

        let ms: u64 = raw.trim().parse().with_context(|| {
            format!(
                "RECORDSET_POLL_INTERVAL_MS must be a number of milliseconds, got '{}'",
                raw
            )
        })?;
        if ms == 0 {
            anyhow::bail!("RECORDSET_POLL_INTERVAL_MS must be greater than zero");
        }

        Ok(Some(Duration::from_millis(ms)))
    }

    fn reconciler_config(&self) -> Result<ReconcilerConfig> {
        let mut config = ReconcilerConfig::new();
        if let Some(interval) = self.poll_interval()? {
            config = config.with_poll_interval(interval);
        }

        let timeouts = self.timeouts()?;
        if let Some(create) = timeouts.create {
            config.timeouts.create_secs = create.as_secs().max(1);
        }
        if let Some(update) = timeouts.update {
            config.timeouts.update_secs = update.as_secs().max(1);
        }
        if let Some(delete) = timeouts.delete {
            config.timeouts.delete_secs = delete.as_secs().max(1);
        }

        config.validate()?;
        Ok(config)
    }

    fn timeouts(&self) -> Result<ResourceTimeouts> {
        for (key, value) in [
            ("RECORDSET_CREATE_TIMEOUT", &self.create_timeout),
            ("RECORDSET_UPDATE_TIMEOUT", &self.update_timeout),
            ("RECORDSET_DELETE_TIMEOUT", &self.delete_timeout),
        ] {
            if let Some(value) = value {
                parse_duration(value).with_context(|| format!("{} is not valid", key))?;
            }
        }

        Ok(ResourceTimeouts::parse(
            self.create_timeout.as_deref(),
            self.update_timeout.as_deref(),
            self.delete_timeout.as_deref(),
        )?)
    }
}

/// Read desired state from a JSON file
fn load_spec(path: &Path) -> Result<RecordSetSpec> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;
    let spec: RecordSetSpec = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse spec file {}", path.display()))?;
    spec.validate()?;
    Ok(spec)
}

/// Flat attribute map printed for a record set
fn render(token: &str, record_set: &RecordSet) -> Result<String> {
    let mut attrs = record_set.attributes();
    attrs.insert("token".into(), token.into());
    Ok(serde_json::to_string_pretty(&attrs)?)
}

#[cfg(feature = "designate")]
fn build_client(config: &Config) -> Result<Arc<dyn ControlPlaneClient>> {
    let client =
        recordset_client_designate::DesignateClient::new(&config.endpoint, &config.auth_token)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "designate"))]
fn build_client(_config: &Config) -> Result<Arc<dyn ControlPlaneClient>> {
    anyhow::bail!("recordsetctl was built without a control-plane client (enable feature 'designate')")
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return CtlExitCode::ConfigError.into();
    }

    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CtlExitCode::ConfigError.into();
    }

    let (client, reconciler_config) = match build_client(&config)
        .and_then(|client| Ok((client, config.reconciler_config()?)))
    {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to initialize: {:#}", e);
            return CtlExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CtlExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            match wait_for_shutdown().await {
                Ok(signal) => {
                    info!("Received {}, cancelling", signal);
                    let _ = cancel_tx.send(true);
                }
                Err(e) => error!("Signal handling unavailable: {}", e),
            }
        });

        let ctx = OperationContext::new().with_cancellation(cancel_rx);
        run(cli.command, client, reconciler_config, &ctx).await
    });

    match result {
        Ok(Outcome::Done) => CtlExitCode::Success.into(),
        Ok(Outcome::StillPresent) => CtlExitCode::DestroyCheckFailed.into(),
        Err(e) => {
            error!("{:#}", e);
            CtlExitCode::RuntimeError.into()
        }
    }
}

/// Run a single command
async fn run(
    command: Command,
    client: Arc<dyn ControlPlaneClient>,
    config: ReconcilerConfig,
    ctx: &OperationContext,
) -> Result<Outcome> {
    let reconciler = Reconciler::new(client.clone(), config)?;

    match command {
        Command::Create { spec } => {
            let desired = load_spec(&spec)?;
            let (id, created) = reconciler.create(&desired, ctx).await?;
            println!("{}", render(&id.to_string(), &created)?);
        }
        Command::Read { token } => match reconciler.read(&token).await? {
            Observed::Present(record_set) => println!("{}", render(&token, &record_set)?),
            Observed::Absent => println!("absent"),
        },
        Command::Update { token, spec } => {
            let desired = load_spec(&spec)?;
            let updated = reconciler.update(&token, &desired, ctx).await?;
            println!("{}", render(&token, &updated)?);
        }
        Command::Delete { token } => {
            reconciler.delete(&token, ctx).await?;
            println!("absent");
        }
        Command::CheckDestroyed { token } => {
            let verifier = ExistenceVerifier::new(client);
            match verifier.assert_absent_token(&token).await {
                Ok(()) => println!("absent"),
                Err(CoreError::UnexpectedlyPresent { zone_id, record_id }) => {
                    error!("Record set {} in zone {} still exists", record_id, zone_id);
                    return Ok(Outcome::StillPresent);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(Outcome::Done)
}

/// Wait for SIGTERM or SIGINT
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

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
