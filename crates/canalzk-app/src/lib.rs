//! Process-level wiring for the exporter: the HTTP surface and signal
//! handling shared by the binary and the integration tests.

use std::io;
use std::sync::Arc;

use canalzk_config::{Config, ConfigManager};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::task::JoinHandle;

pub mod http;

pub use http::{router, AppState};

/// CTRL+C and SIGTERM handlers, registered up front so a registration
/// failure surfaces at startup instead of as an immediate shutdown.
pub struct ShutdownSignal {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignal {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Resolve on the first CTRL+C or SIGTERM.
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => { tracing::info!("Received CTRL+C"); }
            _ = self.terminate.recv() => { tracing::info!("Received SIGTERM"); }
        }
    }
}

/// Reload `manager` from its file on every SIGHUP.
///
/// A failed reload is logged and the previous configuration stays active.
pub fn spawn_reload_on_sighup<T>(manager: Arc<ConfigManager<T>>) -> io::Result<JoinHandle<()>>
where
    T: Config + Clone,
{
    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!("Received SIGHUP");
            if let Err(e) = manager.reload() {
                tracing::warn!(error = %e, "config reload failed, keeping current config");
            }
        }
    }))
}
