mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::Registry;
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crossseed_core::metrics::{encode_metrics, register_metrics};
use crossseed_core::{
    load_config, validate_config, CancelToken, CrossSeedOrchestrator, SanitizedConfig, TokioClock,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so a JSON summary on stdout stays parseable.
    if std::env::var_os("CROSSSEED_LOG_JSON").is_some() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// First argument, then `CROSSSEED_CONFIG`, then `config.toml`.
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("CROSSSEED_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

async fn run() -> Result<i32> {
    init_logging();

    let config_path = config_path();
    info!(version = VERSION, "Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(sanitized.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        parse_dir = %config.paths.parse_dir.display(),
        save_path = %config.paths.save_path.display(),
        backends = config.backends.iter().filter(|b| b.enabled).count(),
        "Configuration loaded"
    );
    debug!(config = %sanitized, "Effective configuration");

    let registry = Registry::new();
    if config.output.metrics {
        register_metrics(&registry).context("Failed to register metrics")?;
    }

    let orchestrator = CrossSeedOrchestrator::from_config(&config, Arc::new(TokioClock))
        .await
        .context("Failed to set up orchestrator")?;

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, finishing releases in progress");
        signal_cancel.cancel();
    });

    let summary = orchestrator
        .run(cancel)
        .await
        .context("Cross-seed run failed")?;

    if config.output.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", report::render(&summary));
    }

    if config.output.metrics {
        let metrics = encode_metrics(&registry).context("Failed to encode metrics")?;
        if config.output.json {
            eprint!("{}", metrics);
        } else {
            print!("\n{}", metrics);
        }
    }

    Ok(report::exit_code(&summary))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
