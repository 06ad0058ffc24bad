//! FTRT dashboard core: canonical view model, schema normalization, the
//! fallback resolver, and the pure refresh state machine.
mod fallback;
mod model;
mod normalize;
mod refresh;

pub use fallback::fallback_model;
pub use model::{
    historical_events, AlertBadge, AlertLevel, DashboardModel, HistoricalEvent,
    NormalizationWarning, PlanetaryContribution, PredictedAlert, PredictionPoint,
};
pub use normalize::{normalize, NormalizeError, Normalized};
pub use refresh::{
    update, CycleOutcome, Effect, ErrorInfo, Msg, Phase, PublishOutcome, RefreshErrorKind,
    RefreshState,
};
