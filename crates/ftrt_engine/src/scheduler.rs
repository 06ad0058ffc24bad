use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use ftrt_core::{
    fallback_model, normalize, update, CycleOutcome, Effect, ErrorInfo, Msg, NormalizeError,
    Normalized, Phase, PublishOutcome, RefreshErrorKind, RefreshState,
};
use ftrt_logging::{ftrt_debug, ftrt_info, ftrt_warn};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::client::{EndpointSpec, UpstreamClient, UpstreamError};
use crate::store::ModelStore;

/// Clock injected into the scheduler: stamps combined-report request bodies
/// and fallback models, and keeps both testable.
pub type ClockFn = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Clone)]
pub struct SchedulerSettings {
    /// Delay between the end of one cycle and the start of the next.
    pub refresh_interval: Duration,
    pub today: ClockFn,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(3600),
            today: Arc::new(|| chrono::Local::now().date_naive()),
        }
    }
}

enum Command {
    Refresh,
}

/// Handle to a running scheduler task. Dropping the handle tears the
/// scheduler down: the pending timer and any in-flight request are
/// cancelled and no further store writes occur.
pub struct SchedulerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
}

impl SchedulerHandle {
    /// Starts the refresh loop on the current tokio runtime. The first
    /// cycle begins immediately; later cycles follow the configured
    /// interval. With no endpoint configured every cycle serves the
    /// fallback model.
    pub fn spawn(
        client: Arc<dyn UpstreamClient>,
        endpoint: Option<EndpointSpec>,
        settings: SchedulerSettings,
        store: ModelStore,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(run_loop(
            client,
            endpoint,
            settings,
            store,
            cmd_rx,
            cancel.clone(),
        ));
        Self { cmd_tx, cancel }
    }

    /// Requests an immediate refresh. Coalesced into the in-flight attempt
    /// if a cycle is already running.
    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(Command::Refresh);
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Driver {
    client: Arc<dyn UpstreamClient>,
    endpoint: Option<EndpointSpec>,
    settings: SchedulerSettings,
    store: ModelStore,
    cycle_tx: mpsc::UnboundedSender<CycleOutcome>,
    cancel: CancellationToken,
    state: RefreshState,
}

async fn run_loop(
    client: Arc<dyn UpstreamClient>,
    endpoint: Option<EndpointSpec>,
    settings: SchedulerSettings,
    store: ModelStore,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    let (cycle_tx, mut cycle_rx) = mpsc::unbounded_channel();
    let mut driver = Driver {
        client,
        endpoint,
        settings,
        store,
        cycle_tx,
        cancel,
        state: RefreshState::new(),
    };

    let sleep = time::sleep(driver.settings.refresh_interval);
    tokio::pin!(sleep);

    // The first cycle starts immediately; the timer only drives re-fetches.
    driver.dispatch(Msg::RefreshRequested, sleep.as_mut());

    loop {
        let msg = tokio::select! {
            _ = driver.cancel.cancelled() => {
                driver.state = update(std::mem::take(&mut driver.state), Msg::TearDown).0;
                ftrt_info!(
                    "scheduler torn down after {} cycles",
                    driver.state.cycles_completed()
                );
                break;
            }
            () = &mut sleep => {
                // Re-arm before dispatching so an elapsed timer never spins.
                sleep
                    .as_mut()
                    .reset(time::Instant::now() + driver.settings.refresh_interval);
                Msg::RefreshRequested
            }
            Some(Command::Refresh) = cmd_rx.recv() => Msg::RefreshRequested,
            Some(outcome) = cycle_rx.recv() => Msg::CycleCompleted(outcome),
        };
        driver.dispatch(msg, sleep.as_mut());
    }
}

impl Driver {
    fn dispatch(&mut self, msg: Msg, mut sleep: Pin<&mut time::Sleep>) {
        if matches!(msg, Msg::RefreshRequested) && self.state.phase() == Phase::Fetching {
            ftrt_debug!("refresh request coalesced into the in-flight cycle");
        }

        let (next, effects) = update(std::mem::take(&mut self.state), msg);
        self.state = next;

        for effect in effects {
            match effect {
                Effect::BeginFetch => self.begin_fetch(),
                Effect::Publish(outcome) => self.publish(outcome),
                Effect::ScheduleNext => sleep
                    .as_mut()
                    .reset(time::Instant::now() + self.settings.refresh_interval),
            }
        }
    }

    fn begin_fetch(&self) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let today = (self.settings.today)();
        let cycle_tx = self.cycle_tx.clone();
        let cancel = self.cancel.child_token();
        ftrt_info!("refresh cycle started");
        tokio::spawn(async move {
            let outcome = tokio::select! {
                // Teardown mid-flight: abandon the request, report nothing.
                _ = cancel.cancelled() => return,
                outcome = run_cycle(client.as_ref(), endpoint.as_ref(), today) => outcome,
            };
            let _ = cycle_tx.send(outcome);
        });
    }

    fn publish(&self, outcome: PublishOutcome) {
        match outcome {
            PublishOutcome::Fresh(model) => {
                ftrt_info!(
                    "publishing live model ftrt={} alert={} warnings={}",
                    model.ftrt_value,
                    model.alert.level,
                    model.warnings.len()
                );
                self.store.publish_fresh(model);
            }
            PublishOutcome::Fallback { error } => {
                let today = (self.settings.today)();
                match &error {
                    Some(error) => ftrt_warn!(
                        "cycle failed ({}: {}); serving fallback model",
                        error.kind,
                        error.message
                    ),
                    None => ftrt_info!("upstream payload empty; serving fallback model"),
                }
                self.store.publish_degraded(fallback_model(today), error);
            }
        }
    }
}

async fn run_cycle(
    client: &dyn UpstreamClient,
    endpoint: Option<&EndpointSpec>,
    today: NaiveDate,
) -> CycleOutcome {
    let Some(endpoint) = endpoint else {
        return CycleOutcome::Failed(ErrorInfo {
            kind: RefreshErrorKind::UpstreamUnreachable,
            message: "no upstream endpoint configured".to_owned(),
        });
    };

    let report = match client.fetch(endpoint, today).await {
        Ok(report) => report,
        Err(err) => return CycleOutcome::Failed(upstream_error_info(err)),
    };

    match normalize(&report.documents, today) {
        Ok(Normalized::Model(model)) => CycleOutcome::Fresh(model),
        Ok(Normalized::EmptyPayload) => CycleOutcome::EmptyUpstream,
        Err(err) => CycleOutcome::Failed(normalize_error_info(err)),
    }
}

fn upstream_error_info(err: UpstreamError) -> ErrorInfo {
    let kind = match &err {
        UpstreamError::Unreachable(_) => RefreshErrorKind::UpstreamUnreachable,
        UpstreamError::Malformed(_) => RefreshErrorKind::UpstreamMalformed,
    };
    ErrorInfo {
        kind,
        message: err.to_string(),
    }
}

fn normalize_error_info(err: NormalizeError) -> ErrorInfo {
    let kind = match &err {
        NormalizeError::UnrecognizedSchema => RefreshErrorKind::UnrecognizedSchema,
        NormalizeError::IncompleteData { .. } => RefreshErrorKind::IncompleteData,
    };
    ErrorInfo {
        kind,
        message: err.to_string(),
    }
}
