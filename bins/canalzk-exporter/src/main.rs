use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use canalzk_app::{router, AppState, ShutdownSignal};
use canalzk_collector::ExporterConfig;
use canalzk_config::{Config, ConfigManager};
use canalzk_coord::ZkStore;
use clap::Parser;
use tokio::net::TcpListener;

/// Prometheus exporter for canal destinations registered in ZooKeeper
#[derive(Parser, Debug)]
#[command(name = "canalzk-exporter", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "canalzk.toml")]
    config: PathBuf,

    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", value_name = "ADDR")]
    web_listen_address: Option<String>,

    /// Timeout for responding to http requests, in seconds
    #[arg(long = "web.timeout", value_name = "SECS")]
    web_timeout: Option<f64>,

    /// Timeout for ZooKeeper requests, in seconds
    #[arg(long = "zk.timeout", value_name = "SECS")]
    zk_timeout: Option<f64>,

    /// Dump default configuration and exit
    #[arg(long)]
    dump_default_config: bool,
}

/// Command line values that take precedence over the config file, including
/// across SIGHUP reloads.
#[derive(Debug, Clone, Default)]
struct Overrides {
    listen_address: Option<String>,
    web_timeout: Option<Duration>,
    zk_timeout: Option<Duration>,
}

impl Overrides {
    fn from_args(args: &Args) -> anyhow::Result<Self> {
        Ok(Self {
            listen_address: args.web_listen_address.clone(),
            web_timeout: args.web_timeout.map(|s| seconds("--web.timeout", s)).transpose()?,
            zk_timeout: args.zk_timeout.map(|s| seconds("--zk.timeout", s)).transpose()?,
        })
    }

    fn apply(&self, cfg: &mut ExporterConfig) {
        if let Some(addr) = &self.listen_address {
            cfg.web.listen_address = addr.clone();
        }
        if let Some(timeout) = self.web_timeout {
            cfg.web.timeout = timeout;
        }
        if let Some(timeout) = self.zk_timeout {
            cfg.zk.timeout = timeout;
        }
    }
}

fn seconds(flag: &str, secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid {}: {}", flag, secs))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_default_config {
        print!("{}", ExporterConfig::default().render());
        return Ok(());
    }

    let overrides = Overrides::from_args(&args)?;
    let manager = ConfigManager::<ExporterConfig>::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?
        .with_overrides(move |cfg| overrides.apply(cfg))
        .context("invalid command line override")?;
    let cfg = manager.snapshot();
    let manager = Arc::new(manager);

    let _log_guard = canalzk_logging::init_logging(&cfg.log).context("failed to init logging")?;

    let addr = cfg.web.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        config = %args.config.display(),
        %addr,
        metrics_path = %cfg.web.metrics_path,
        clusters = cfg.clusters.len(),
        "Starting canal ZooKeeper exporter"
    );

    let shutdown = ShutdownSignal::install().context("failed to install shutdown handlers")?;
    let _reload = canalzk_app::spawn_reload_on_sighup(manager.clone())
        .context("failed to install SIGHUP handler")?;

    let state = AppState::new(Arc::new(ZkStore::new()), manager);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.recv())
        .await
        .context("server error")?;

    tracing::info!("Exporter shutting down");
    Ok(())
}
