// SPDX-License-Identifier: Apache-2.0

use crate::init::args::{AgentRun, Uploader};
use crate::init::config;
use crate::logs::{BlackholeUploader, CheckpointStore, LogScheduler, LogUploader, StdoutUploader};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, error, info};

pub struct Agent {
    config: Box<AgentRun>,
    refresh_rx: Option<flume::Receiver<()>>,
}

impl Agent {
    pub fn new(config: Box<AgentRun>) -> Self {
        Self {
            config,
            refresh_rx: None,
        }
    }

    /// Every message on this channel refreshes all components immediately.
    pub fn with_refresh_requests(mut self, refresh_rx: flume::Receiver<()>) -> Self {
        self.refresh_rx = Some(refresh_rx);
        self
    }

    pub async fn run(self, agent_cancel: CancellationToken) -> Result<(), BoxError> {
        let config = self.config;

        let settings = config::load(config.config_file.as_deref(), &config.root_path)?;

        let store = Arc::new(CheckpointStore::new(&config.work_dir));
        let uploader: Arc<dyn LogUploader> = match config.uploader {
            Uploader::Blackhole => Arc::new(BlackholeUploader::new()),
            Uploader::Stdout => Arc::new(StdoutUploader),
        };
        let not_before = SystemTime::UNIX_EPOCH + Duration::from_secs(config.not_before_secs);

        info!(
            components = settings.components.len(),
            interval = ?settings.interval,
            work_dir = ?config.work_dir,
            "Starting log keeper"
        );

        let mut scheduler =
            LogScheduler::new(store, uploader, settings.interval).with_not_before(not_before);
        scheduler.apply(settings.components);

        let mut reload = ReloadSignal::new()?;
        loop {
            select! {
                _ = agent_cancel.cancelled() => {
                    debug!("Agent cancellation signaled.");
                    break;
                },
                _ = reload.recv() => {
                    info!("Reloading log configuration");
                    match config::load(config.config_file.as_deref(), &config.root_path) {
                        Ok(reloaded) => {
                            scheduler.set_interval(reloaded.interval);
                            scheduler.apply(reloaded.components);
                        }
                        Err(e) => error!(
                            error = %e,
                            "Failed to reload log configuration, keeping the current one"
                        ),
                    }
                },
                true = next_refresh(self.refresh_rx.as_ref()) => {
                    for component in scheduler.components() {
                        scheduler.trigger(&component);
                    }
                },
            }
        }

        let timeout = Duration::from_secs(config.shutdown_timeout_secs);
        if let Err(e) = scheduler.shutdown(timeout).await {
            return Err(format!("timed out waiting for log components to exit: {}", e).into());
        }
        Ok(())
    }
}

// Resolves to false once every sender is gone, true per request
async fn next_refresh(refresh_rx: Option<&flume::Receiver<()>>) -> bool {
    match refresh_rx {
        Some(rx) => rx.recv_async().await.is_ok(),
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
struct ReloadSignal(tokio::signal::unix::Signal);

#[cfg(unix)]
impl ReloadSignal {
    fn new() -> Result<Self, BoxError> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self(signal(SignalKind::hangup())?))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct ReloadSignal;

#[cfg(not(unix))]
impl ReloadSignal {
    fn new() -> Result<Self, BoxError> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await
    }
}
