//! The polling loop: gate, check every target, persist, sleep.
use thiserror::Error;
use tracing::{error, info, warn};

use super::config::{Config, TargetConfig};
use super::connectivity::ConnectivityGate;
use super::fetcher::fetch;
use super::observation::StatusOutcome;
use super::shutdown::{Cancelled, ShutdownSignal};
use super::transport::HttpTransport;
use crate::alerting::change_detector::evaluate;
use crate::notifications::service::NotificationService;
use crate::store::StoreError;
use crate::store::diff_store::{DiffStore, RecordOutcome};
use crate::store::models::StateSnapshot;
use crate::store::state_store::StateStore;

/// Exit marker written when the operator stops the loop.
pub const INTERRUPTED_MARKER: &str = "Interrupted";

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one target during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub url: String,
    pub status: StatusOutcome,
    pub first_check: bool,
    pub changed: bool,
    pub history: Option<RecordOutcome>,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub targets: Vec<TargetReport>,
}

pub struct Monitor {
    config: Config,
    transport: Box<dyn HttpTransport>,
    notifier: NotificationService,
    gate: ConnectivityGate,
    state_store: StateStore,
    diff_store: DiffStore,
    snapshot: StateSnapshot,
}

impl Monitor {
    /// Prepares the history directory and loads the previous snapshot.
    /// An exit marker left by the previous run is logged and cleared.
    pub fn new(
        config: Config,
        transport: Box<dyn HttpTransport>,
        notifier: NotificationService,
    ) -> Result<Self, StoreError> {
        let diff_store = DiffStore::new(&config.history_dir);
        diff_store.ensure_dir()?;
        let state_store = StateStore::new(&config.state_file);
        let mut snapshot = state_store.load();
        if let Some(marker) = snapshot.script_exit.take() {
            warn!(reason = %marker, "Previous run did not end normally.");
        }
        let gate = ConnectivityGate::new(
            config.online_check_reference.clone(),
            config.online_check_delay,
        );

        Ok(Self {
            config,
            transport,
            notifier,
            gate,
            state_store,
            diff_store,
            snapshot,
        })
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn notifier(&self) -> &NotificationService {
        &self.notifier
    }

    /// Runs until shutdown is requested or persisting fails.
    ///
    /// Either way the snapshot is written one last time with `script_exit`
    /// set to the cause. A requested shutdown returns `Ok`.
    pub async fn run(&mut self, shutdown: ShutdownSignal) -> Result<(), MonitorError> {
        info!(
            targets = self.config.targets.len(),
            check_delay_seconds = self.config.check_delay.as_secs_f64(),
            "Monitor started."
        );
        match self.run_loop(shutdown).await {
            Ok(()) => {
                info!("Shutdown requested, saving state.");
                self.persist_with_exit(INTERRUPTED_MARKER)?;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Monitor loop failed, saving state before exit.");
                if let Err(persist_error) = self.persist_with_exit(&e.to_string()) {
                    error!(error = %persist_error, "Failed to save state after loop failure.");
                }
                Err(e)
            }
        }
    }

    // Returns Ok(()) once shutdown was observed.
    async fn run_loop(&mut self, mut shutdown: ShutdownSignal) -> Result<(), MonitorError> {
        let mut first_iteration = true;
        loop {
            if first_iteration || self.config.online_check_every_cycle {
                if self
                    .gate
                    .wait_until_online(self.transport.as_ref(), &mut shutdown)
                    .await
                    .is_err()
                {
                    return Ok(());
                }
            }
            first_iteration = false;

            if self.run_cycle(&mut shutdown).await.is_err() {
                return Ok(());
            }
            self.persist()?;

            info!(
                seconds = self.config.check_delay.as_secs_f64(),
                "Cycle finished, sleeping."
            );
            if shutdown.sleep(self.config.check_delay).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Checks every configured target once, in order. Shutdown is honored
    /// between targets; state gathered so far stays in the snapshot.
    pub async fn run_cycle(&mut self, shutdown: &mut ShutdownSignal) -> Result<CycleReport, Cancelled> {
        let targets = self.config.targets.clone();
        let mut report = CycleReport::default();
        for target in &targets {
            shutdown.check()?;
            report.targets.push(self.process_target(target).await);
        }
        let changed = report.targets.iter().filter(|t| t.changed).count();
        info!(checked = report.targets.len(), changed, "Checked all targets.");
        Ok(report)
    }

    async fn process_target(&mut self, target: &TargetConfig) -> TargetReport {
        info!(url = %target.url, "Checking target.");
        let observation = fetch(self.transport.as_ref(), target).await;
        let evaluation = evaluate(target, self.snapshot.targets.get(&target.url), &observation);
        self.snapshot
            .targets
            .insert(target.url.clone(), evaluation.state.clone());

        let mut history = None;
        if evaluation.changed() {
            match self.diff_store.record_if_changed(
                &target.url,
                &observation.status,
                &evaluation.current_content,
                &evaluation.previous_content,
            ) {
                Ok(outcome) => history = Some(outcome),
                Err(e) => {
                    error!(url = %target.url, error = %e, "Failed to record content history.");
                }
            }
        }

        let mut notifications_sent = 0;
        let mut notifications_failed = 0;
        for notification in evaluation.notifications.iter().cloned() {
            match self.notifier.notify(notification).await {
                Ok(()) => notifications_sent += 1,
                Err(e) => {
                    notifications_failed += 1;
                    warn!(url = %target.url, error = %e, "Notification not delivered yet.");
                }
            }
        }

        TargetReport {
            url: target.url.clone(),
            status: observation.status,
            first_check: evaluation.is_first_check,
            changed: evaluation.changed(),
            history,
            notifications_sent,
            notifications_failed,
        }
    }

    /// Writes the current snapshot to the state file.
    pub fn persist(&self) -> Result<(), StoreError> {
        self.state_store.save(&self.snapshot)
    }

    fn persist_with_exit(&mut self, reason: &str) -> Result<(), StoreError> {
        self.snapshot.script_exit = Some(reason.to_string());
        self.persist()
    }
}
