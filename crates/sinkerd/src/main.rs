// # sinkerd - Sinker Registry Daemon
//
// Thin integration layer: no registry logic lives here, everything is in
// sinker-core. Configuration is via environment variables only.
//
// The sinkerd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime
// 3. Registering store and geo backends
// 4. Opening the registry and flushing it on shutdown
//
// ## Configuration
//
// ### Store
// - `SINKER_STORE_TYPE`: Type of probe store (file, memory)
// - `SINKER_STORE_PATH`: Path to the store file (for file store)
//
// ### Geolocation
// - `SINKER_GEO_TYPE`: Type of geo lookup (none, file, http)
// - `SINKER_GEO_PATH`: Path to the geo database (for file)
// - `SINKER_GEO_URL`: Lookup service base URL (for http)
// - `SINKER_GEO_TIMEOUT_SECS`: Request timeout in seconds (for http)
//
// ### Probes
// - `SINKER_TRACES_PATH`: Default traces path for new probes
//
// ### Logging
// - `SINKER_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export SINKER_STORE_TYPE=file
// export SINKER_STORE_PATH=/var/lib/sinker/probes.json
// export SINKER_GEO_TYPE=file
// export SINKER_GEO_PATH=/usr/share/sinker/geo.json
//
// sinkerd
// ```

use anyhow::Result;
use sinker_core::config::{
    DEFAULT_TRACES_PATH, GeoConfig, ProbeDefaults, RegistryConfig, StoreConfig,
};
use sinker_core::{BackendRegistry, LifecycleManager};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SinkerExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SinkerExitCode> for ExitCode {
    fn from(code: SinkerExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
struct Config {
    store_type: String,
    store_path: Option<String>,
    geo_type: String,
    geo_path: Option<String>,
    geo_url: Option<String>,
    geo_timeout_secs: Option<u64>,
    traces_path: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let geo_timeout_secs = match env::var("SINKER_GEO_TIMEOUT_SECS") {
            Ok(s) => Some(s.parse().map_err(|e| {
                anyhow::anyhow!("SINKER_GEO_TIMEOUT_SECS '{}' is not a number: {}", s, e)
            })?),
            Err(_) => None,
        };

        Ok(Self {
            store_type: env::var("SINKER_STORE_TYPE").unwrap_or_else(|_| "file".to_string()),
            store_path: env::var("SINKER_STORE_PATH").ok(),
            geo_type: env::var("SINKER_GEO_TYPE").unwrap_or_else(|_| "none".to_string()),
            geo_path: env::var("SINKER_GEO_PATH").ok(),
            geo_url: env::var("SINKER_GEO_URL").ok(),
            geo_timeout_secs,
            traces_path: env::var("SINKER_TRACES_PATH")
                .unwrap_or_else(|_| DEFAULT_TRACES_PATH.to_string()),
            log_level: env::var("SINKER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks the daemon-level settings; the registry configuration built
    /// from them is validated again by sinker-core.
    fn validate(&self) -> Result<()> {
        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "SINKER_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        if self.store_type == "file" {
            let Some(path) = self.store_path.as_deref().filter(|p| !p.is_empty()) else {
                anyhow::bail!(
                    "SINKER_STORE_PATH is required when SINKER_STORE_TYPE=file. \
                    Set it via: export SINKER_STORE_PATH=/var/lib/sinker/probes.json"
                );
            };

            if let Some(parent) = std::path::Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                anyhow::bail!(
                    "SINKER_STORE_PATH parent directory does not exist: {}. \
                    Create it first: sudo mkdir -p {}",
                    parent.display(),
                    parent.display()
                );
            }
        }

        match self.geo_type.as_str() {
            "none" => {}
            "file" => {
                if self.geo_path.as_ref().is_none_or(|p| p.is_empty()) {
                    anyhow::bail!("SINKER_GEO_PATH is required when SINKER_GEO_TYPE=file");
                }
            }
            "http" => {
                if !cfg!(feature = "http-geo") {
                    anyhow::bail!("SINKER_GEO_TYPE=http requires the http-geo feature");
                }
                if self.geo_url.as_ref().is_none_or(|u| u.is_empty()) {
                    anyhow::bail!("SINKER_GEO_URL is required when SINKER_GEO_TYPE=http");
                }
            }
            _ => anyhow::bail!(
                "SINKER_GEO_TYPE '{}' is not supported. \
                Supported types: none, file, http",
                self.geo_type
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SINKER_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.registry_config().validate()?;
        Ok(())
    }

    /// Translate the environment settings into a registry configuration
    fn registry_config(&self) -> RegistryConfig {
        let store = match self.store_type.as_str() {
            "file" => StoreConfig::File {
                path: self.store_path.clone().unwrap_or_default(),
            },
            _ => StoreConfig::Memory,
        };

        let geo = match self.geo_type.as_str() {
            "file" => GeoConfig::File {
                path: self.geo_path.clone().unwrap_or_default(),
            },
            "http" => GeoConfig::Http {
                url: self.geo_url.clone().unwrap_or_default(),
                timeout_secs: self.geo_timeout_secs.unwrap_or(5),
            },
            _ => GeoConfig::None,
        };

        RegistryConfig {
            store,
            geo,
            defaults: ProbeDefaults {
                traces_path: self.traces_path.clone(),
            },
        }
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SinkerExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SinkerExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SinkerExitCode::ConfigError.into();
    }

    info!("Starting sinkerd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SinkerExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => SinkerExitCode::CleanShutdown,
            Err(e) if is_config_error(&e) => {
                error!("Startup error: {}", e);
                SinkerExitCode::ConfigError
            }
            Err(e) => {
                error!("Daemon error: {}", e);
                SinkerExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Backend construction rejected the configuration
fn is_config_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sinker_core::Error>(),
        Some(sinker_core::Error::Config(_))
    )
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let backends = BackendRegistry::with_builtins();

    #[cfg(feature = "http-geo")]
    {
        info!("Registering HTTP geo lookup");
        sinker_geo_http::register(&backends);
    }

    info!("Store type: {}", config.store_type);
    info!("Geo type: {}", config.geo_type);
    info!("Default traces path: {}", config.traces_path);

    let registry = LifecycleManager::from_config(&config.registry_config(), &backends).await?;
    let enabled = registry.count_enabled().await?;
    info!("Registry ready: {} enabled probe(s)", enabled);

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    registry.flush().await?;
    info!("Registry flushed, shutting down");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
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
