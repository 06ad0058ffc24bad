use std::fmt;

use crate::model::DashboardModel;

/// Refresh-cycle phase. A completed cycle always returns to `Idle`; the
/// success/failure distinction lives in the emitted publish effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefreshState {
    phase: Phase,
    torn_down: bool,
    cycles_completed: u64,
    coalesced_refreshes: u64,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Manual refresh requests absorbed by an in-flight cycle.
    pub fn coalesced_refreshes(&self) -> u64 {
        self.coalesced_refreshes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshErrorKind {
    UpstreamUnreachable,
    UpstreamMalformed,
    UnrecognizedSchema,
    IncompleteData,
}

impl fmt::Display for RefreshErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshErrorKind::UpstreamUnreachable => write!(f, "upstream unreachable"),
            RefreshErrorKind::UpstreamMalformed => write!(f, "upstream malformed"),
            RefreshErrorKind::UnrecognizedSchema => write!(f, "unrecognized schema"),
            RefreshErrorKind::IncompleteData => write!(f, "incomplete data"),
        }
    }
}

/// Structured error surfaced to the rendering layer alongside a degraded
/// snapshot. Never thrown; always recovered via the fallback resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: RefreshErrorKind,
    pub message: String,
}

/// How a fetch cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Live data normalized successfully.
    Fresh(DashboardModel),
    /// Upstream answered with an empty payload; serve the fallback without
    /// recording an error.
    EmptyUpstream,
    Failed(ErrorInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Timer tick or manual refresh request.
    RefreshRequested,
    /// The in-flight cycle finished.
    CycleCompleted(CycleOutcome),
    /// The hosting view is going away; silence all further effects.
    TearDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    BeginFetch,
    Publish(PublishOutcome),
    ScheduleNext,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Fresh(DashboardModel),
    /// Serve the fallback model, flagged degraded. `error` is `None` for the
    /// expected empty-payload case.
    Fallback { error: Option<ErrorInfo> },
}

/// Pure update function: applies a message to state and returns any effects.
///
/// Enforces the single-flight rule (a refresh requested while `Fetching` is
/// coalesced into the in-flight attempt) and the teardown guarantee (a
/// torn-down machine emits no effects, so no store writes can follow).
pub fn update(mut state: RefreshState, msg: Msg) -> (RefreshState, Vec<Effect>) {
    if state.torn_down {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::RefreshRequested => match state.phase {
            Phase::Idle => {
                state.phase = Phase::Fetching;
                vec![Effect::BeginFetch]
            }
            Phase::Fetching => {
                state.coalesced_refreshes += 1;
                Vec::new()
            }
        },
        Msg::CycleCompleted(outcome) => {
            state.phase = Phase::Idle;
            state.cycles_completed += 1;
            let publish = match outcome {
                CycleOutcome::Fresh(model) => PublishOutcome::Fresh(model),
                CycleOutcome::EmptyUpstream => PublishOutcome::Fallback { error: None },
                CycleOutcome::Failed(error) => PublishOutcome::Fallback { error: Some(error) },
            };
            // A failure never halts future refresh attempts: the next cycle
            // is scheduled regardless of the outcome.
            vec![Effect::Publish(publish), Effect::ScheduleNext]
        }
        Msg::TearDown => {
            state.torn_down = true;
            state.phase = Phase::Idle;
            Vec::new()
        }
    };

    (state, effects)
}
