mod config;
mod logging;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ftrt_core::AlertLevel;
use ftrt_engine::{
    ClientSettings, ModelStore, ReqwestUpstreamClient, SchedulerHandle, SchedulerSettings,
    StoreSnapshot, StoreStatus,
};
use ftrt_logging::{ftrt_info, ftrt_warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load(Path::new(config::CONFIG_FILENAME));
    let destination = if config.log_to_file {
        logging::LogDestination::Both
    } else {
        logging::LogDestination::Terminal
    };
    logging::initialize(destination);
    ftrt_info!(
        "FTRT dashboard data core starting; refresh every {}s",
        config.refresh_interval_secs
    );

    let client = Arc::new(ReqwestUpstreamClient::new(ClientSettings {
        request_timeout: Duration::from_secs(config.request_timeout_secs),
        ..ClientSettings::default()
    }));
    let settings = SchedulerSettings {
        refresh_interval: Duration::from_secs(config.refresh_interval_secs),
        today: Arc::new(|| chrono::Local::now().date_naive()),
    };
    let (store, mut watcher) = ModelStore::new();
    let scheduler = SchedulerHandle::spawn(client, config.endpoint_spec(), settings, store);

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                ftrt_info!("ctrl-c received; shutting down");
                break;
            }
            changed = watcher.changed() => {
                if !changed {
                    break;
                }
                report(&watcher.snapshot());
            }
        }
    }

    scheduler.shutdown();
    Ok(())
}

/// Stand-in for the rendering layer: logs each published snapshot.
fn report(snapshot: &StoreSnapshot) {
    let Some(model) = &snapshot.model else {
        return;
    };

    let status = match snapshot.status {
        StoreStatus::Loading => "loading",
        StoreStatus::Ready => "ready",
        StoreStatus::ReadyDegraded => "degraded",
    };
    ftrt_info!(
        "[{}] {} FTRT {:.3} alert {} {}",
        status,
        model.as_of,
        model.ftrt_value,
        model.alert.level,
        model.alert.color_tag
    );

    if matches!(
        model.alert.level,
        AlertLevel::Critical | AlertLevel::Extreme
    ) {
        ftrt_warn!("alert threshold crossed: {}", model.alert.level);
    }
    if let Some(error) = &snapshot.last_error {
        ftrt_warn!("last refresh error: {}: {}", error.kind, error.message);
    }
    if let Some(peak) = model.peak_prediction() {
        ftrt_info!(
            "prediction peak FTRT {:.3} on {} ({})",
            peak.ftrt_value,
            peak.date,
            AlertLevel::classify(peak.ftrt_value)
        );
    }
    for warning in &model.warnings {
        ftrt_warn!("normalization warning: {:?}", warning);
    }
}
