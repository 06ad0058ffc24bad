//! FTRT engine: upstream IO, refresh scheduling, and the view-model store.
mod client;
mod scheduler;
mod store;

pub use client::{
    ClientSettings, EndpointSpec, RawReport, ReqwestUpstreamClient, UpstreamClient, UpstreamError,
    DEFAULT_HORIZON_DAYS,
};
pub use scheduler::{ClockFn, SchedulerHandle, SchedulerSettings};
pub use store::{ModelStore, ModelWatcher, StoreSnapshot, StoreStatus};
