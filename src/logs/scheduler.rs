// SPDX-License-Identifier: Apache-2.0

//! Periodic and on-demand refresh of every configured component.
//!
//! Each component runs in its own task, so refreshes of one component are
//! strictly sequential while different components proceed in parallel. The
//! blocking file work of a refresh runs on the blocking pool, keeping the
//! timers responsive.
//!
//! A component removed and added back gets a new task while the old one may
//! still be finishing a refresh. Both hold the component's refresh lock, which
//! outlives the task, so their refreshes never overlap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::select;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, error, info, warn};

use crate::init::wait;
use crate::logs::checkpoint::CheckpointStore;
use crate::logs::config::ComponentLogConfiguration;
use crate::logs::upload::{LogUploader, UploadCycle};

/// Default time to wait for component tasks on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct ComponentHandle {
    config_tx: watch::Sender<Arc<ComponentLogConfiguration>>,
    trigger_tx: flume::Sender<()>,
    cancel: CancellationToken,
}

pub struct LogScheduler {
    cycle: Arc<UploadCycle>,
    interval_tx: watch::Sender<Duration>,
    not_before: SystemTime,
    components: HashMap<String, ComponentHandle>,
    refresh_locks: HashMap<String, Arc<Mutex<()>>>,
    tasks: JoinSet<Result<(), BoxError>>,
    cancel: CancellationToken,
}

impl LogScheduler {
    /// Create a scheduler refreshing every component each `interval`.
    ///
    /// Must be used from within a tokio runtime.
    pub fn new(
        store: Arc<CheckpointStore>,
        uploader: Arc<dyn LogUploader>,
        interval: Duration,
    ) -> Self {
        let (interval_tx, _) = watch::channel(clamp_interval(interval));
        Self {
            cycle: Arc::new(UploadCycle::new(store, uploader)),
            interval_tx,
            not_before: SystemTime::UNIX_EPOCH,
            components: HashMap::new(),
            refresh_locks: HashMap::new(),
            tasks: JoinSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Skip files last modified before `not_before` in every cycle.
    pub fn with_not_before(mut self, not_before: SystemTime) -> Self {
        self.not_before = not_before;
        self
    }

    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Change the refresh period of every component.
    ///
    /// Each component's next periodic refresh is rescheduled one full period
    /// from now.
    pub fn set_interval(&self, interval: Duration) {
        let interval = clamp_interval(interval);
        let changed = self.interval_tx.send_if_modified(|current| {
            if *current == interval {
                return false;
            }
            *current = interval;
            true
        });
        if changed {
            info!(interval = ?interval, "Upload interval changed");
        }
    }

    pub fn components(&self) -> Vec<String> {
        let mut names: Vec<_> = self.components.keys().cloned().collect();
        names.sort();
        names
    }

    /// Reconcile the running components with a new set of configurations.
    ///
    /// New components start immediately, changed ones receive the new snapshot
    /// and refresh right away, and missing ones are cancelled.
    pub fn apply(&mut self, configs: Vec<ComponentLogConfiguration>) {
        let wanted: HashMap<String, ComponentLogConfiguration> = configs
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();

        self.components.retain(|name, handle| {
            let keep = wanted.contains_key(name);
            if !keep {
                info!(component = %name, "Stopping log component");
                handle.cancel.cancel();
            }
            keep
        });

        for (name, config) in wanted {
            match self.components.get(&name) {
                Some(handle) => {
                    let changed = **handle.config_tx.borrow() != config;
                    if changed {
                        info!(component = %name, "Log configuration changed");
                        handle.config_tx.send_replace(Arc::new(config));
                    }
                }
                None => self.spawn_component(config),
            }
        }

        // Reap tasks that already finished
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                error!("Log component task failed: {}", e);
            }
        }
    }

    /// Request an immediate refresh. Returns false for an unknown component.
    ///
    /// A request arriving while a refresh is pending or in flight is merged
    /// into it.
    pub fn trigger(&self, component: &str) -> bool {
        let Some(handle) = self.components.get(component) else {
            return false;
        };
        if handle.trigger_tx.try_send(()).is_err() {
            debug!(component, "Refresh already pending, coalescing trigger");
        }
        true
    }

    /// Cancel every component and wait for in-flight refreshes to finish.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<(), BoxError> {
        info!("Stopping log scheduler");
        self.cancel.cancel();
        self.components.clear();
        wait::wait_for_tasks_with_timeout(&mut self.tasks, timeout).await
    }

    fn spawn_component(&mut self, config: ComponentLogConfiguration) {
        let name = config.name.clone();
        info!(
            component = %name,
            directory = ?config.directory_path,
            pattern = %config.file_name_regex,
            "Starting log component"
        );

        let (config_tx, config_rx) = watch::channel(Arc::new(config));
        let (trigger_tx, trigger_rx) = flume::bounded(1);
        let cancel = self.cancel.child_token();
        let refresh_lock = self.refresh_locks.entry(name.clone()).or_default().clone();

        let worker = ComponentWorker {
            name: name.clone(),
            cycle: self.cycle.clone(),
            not_before: self.not_before,
            config_rx,
            interval_rx: self.interval_tx.subscribe(),
            trigger_rx,
            refresh_lock,
            cancel: cancel.clone(),
        };
        self.tasks.spawn(worker.run());

        self.components.insert(
            name,
            ComponentHandle {
                config_tx,
                trigger_tx,
                cancel,
            },
        );
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(Duration::from_millis(1))
}

fn refresh_ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

struct ComponentWorker {
    name: String,
    cycle: Arc<UploadCycle>,
    not_before: SystemTime,
    config_rx: watch::Receiver<Arc<ComponentLogConfiguration>>,
    interval_rx: watch::Receiver<Duration>,
    trigger_rx: flume::Receiver<()>,
    refresh_lock: Arc<Mutex<()>>,
    cancel: CancellationToken,
}

impl ComponentWorker {
    async fn run(mut self) -> Result<(), BoxError> {
        // First tick fires right away
        let mut ticker = refresh_ticker(Instant::now(), *self.interval_rx.borrow());

        loop {
            select! {
                biased;

                _ = self.cancel.cancelled() => break,

                changed = self.config_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    debug!(component = %self.name, "Refreshing after configuration change");
                }

                changed = self.interval_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let period = *self.interval_rx.borrow_and_update();
                    ticker = refresh_ticker(Instant::now() + period, period);
                    debug!(
                        component = %self.name,
                        interval = ?period,
                        "Rescheduled periodic refresh"
                    );
                    continue;
                }

                Ok(()) = self.trigger_rx.recv_async() => {
                    debug!(component = %self.name, "Refreshing on demand");
                }

                _ = ticker.tick() => {}
            }

            self.refresh().await;
        }

        debug!(component = %self.name, "Log component stopped");
        Ok(())
    }

    async fn refresh(&mut self) {
        let _guard = self.refresh_lock.clone().lock_owned().await;
        if self.cancel.is_cancelled() {
            return;
        }

        let config = self.config_rx.borrow_and_update().clone();
        let cycle = self.cycle.clone();
        let cancel = self.cancel.clone();
        let not_before = self.not_before;

        let result =
            tokio::task::spawn_blocking(move || cycle.run(&config, not_before, &cancel)).await;

        match result {
            Ok(Ok(report)) => {
                if report.records_uploaded > 0 {
                    info!(
                        component = %self.name,
                        files = report.files_seen,
                        records = report.records_uploaded,
                        bytes = report.bytes_uploaded,
                        "Uploaded log records"
                    );
                }
                if let Some(retention) = report.retention.filter(|r| !r.deleted.is_empty()) {
                    info!(
                        component = %self.name,
                        deleted = retention.deleted.len(),
                        reclaimed_bytes = retention.reclaimed_bytes,
                        "Reclaimed disk space"
                    );
                }
            }
            Ok(Err(e)) if e.is_transient() => {
                debug!(component = %self.name, error = %e, "Refresh failed, retrying next cycle");
            }
            Ok(Err(e)) => {
                warn!(component = %self.name, error = %e, "Refresh failed");
            }
            Err(e) => {
                error!(component = %self.name, error = %e, "Refresh task panicked");
            }
        }
    }
}
