use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

/// One configured way of reaching the prediction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSpec {
    /// Single combined-report endpoint: POST with a `{"date": ...}` body.
    CombinedReport { url: String },
    /// Current-state and prediction endpoints fetched concurrently. The day
    /// count is appended to `prediction_url` as a path segment.
    Paired {
        current_url: String,
        prediction_url: String,
        horizon_days: u32,
    },
}

/// Nominal prediction horizon when none is configured.
pub const DEFAULT_HORIZON_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Network failure, timeout, or non-2xx response.
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
    /// 2xx response whose body is not valid JSON.
    #[error("upstream returned a malformed body: {0}")]
    Malformed(String),
}

/// Raw documents from one upstream round trip: one for the combined
/// endpoint, two (current then prediction) for the pair. Shape detection
/// happens downstream in the normalizer, never here.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReport {
    pub documents: Vec<Value>,
}

#[async_trait::async_trait]
pub trait UpstreamClient: Send + Sync {
    /// One round trip against the endpoint. `report_date` is the calendar
    /// date stamped into the combined-report request body.
    ///
    /// No retries here; retry policy belongs to the scheduler. A partial
    /// failure of the paired endpoints fails the whole call.
    async fn fetch(
        &self,
        endpoint: &EndpointSpec,
        report_date: NaiveDate,
    ) -> Result<RawReport, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUpstreamClient {
    settings: ClientSettings,
}

impl ReqwestUpstreamClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, UpstreamError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| UpstreamError::Unreachable(err.to_string()))
    }

    async fn get_json(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<Value, UpstreamError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| UpstreamError::Unreachable(format!("invalid url {url}: {err}")))?;
        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json_body(response).await
    }
}

#[async_trait::async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn fetch(
        &self,
        endpoint: &EndpointSpec,
        report_date: NaiveDate,
    ) -> Result<RawReport, UpstreamError> {
        let client = self.build_client()?;

        match endpoint {
            EndpointSpec::CombinedReport { url } => {
                let parsed = reqwest::Url::parse(url).map_err(|err| {
                    UpstreamError::Unreachable(format!("invalid url {url}: {err}"))
                })?;
                let body = serde_json::json!({
                    "date": report_date.format("%Y-%m-%d").to_string(),
                });
                let response = client
                    .post(parsed)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.to_string())
                    .send()
                    .await
                    .map_err(map_reqwest_error)?;
                let document = read_json_body(response).await?;
                Ok(RawReport {
                    documents: vec![document],
                })
            }
            EndpointSpec::Paired {
                current_url,
                prediction_url,
                horizon_days,
            } => {
                let prediction_url =
                    format!("{}/{}", prediction_url.trim_end_matches('/'), horizon_days);
                // Both legs run concurrently and fail together: a partial
                // arrival is a full-cycle failure, never a half-filled model.
                let (current, prediction) = futures_util::future::try_join(
                    self.get_json(&client, current_url),
                    self.get_json(&client, &prediction_url),
                )
                .await?;
                Ok(RawReport {
                    documents: vec![current, prediction],
                })
            }
        }
    }
}

async fn read_json_body(response: reqwest::Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Unreachable(format!("http status {status}")));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Malformed(err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> UpstreamError {
    UpstreamError::Unreachable(err.to_string())
}
