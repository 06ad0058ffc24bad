use std::fs;
use std::path::Path;

use ftrt_engine::{EndpointSpec, DEFAULT_HORIZON_DAYS};
use ftrt_logging::{ftrt_info, ftrt_warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILENAME: &str = "dashboard.ron";

/// Which upstream variant this instance talks to. Variant selection only
/// picks the endpoints; the payload schema is still detected from the
/// response itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EndpointConfig {
    /// No upstream configured; every cycle serves the fallback model.
    None,
    Combined {
        url: String,
    },
    Paired {
        current_url: String,
        prediction_url: String,
        horizon_days: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub endpoint: EndpointConfig,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::Combined {
                url: "http://localhost:1111/api/ftrt/report".to_owned(),
            },
            refresh_interval_secs: 3600,
            request_timeout_secs: 30,
            log_to_file: false,
        }
    }
}

impl AppConfig {
    pub fn endpoint_spec(&self) -> Option<EndpointSpec> {
        match &self.endpoint {
            EndpointConfig::None => None,
            EndpointConfig::Combined { url } => Some(EndpointSpec::CombinedReport {
                url: url.clone(),
            }),
            EndpointConfig::Paired {
                current_url,
                prediction_url,
                horizon_days,
            } => Some(EndpointSpec::Paired {
                current_url: current_url.clone(),
                prediction_url: prediction_url.clone(),
                horizon_days: if *horizon_days == 0 {
                    DEFAULT_HORIZON_DAYS
                } else {
                    *horizon_days
                },
            }),
        }
    }
}

/// Load the RON config, falling back to defaults when the file is missing
/// or unparsable.
pub fn load(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            ftrt_info!("No config file at {:?}; using defaults", path);
            return AppConfig::default();
        }
        Err(err) => {
            ftrt_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            ftrt_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}
