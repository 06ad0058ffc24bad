use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use ftrt_core::{fallback_model, RefreshErrorKind};
use ftrt_engine::{
    ClientSettings, EndpointSpec, ModelStore, RawReport, ReqwestUpstreamClient, SchedulerHandle,
    SchedulerSettings, StoreStatus, UpstreamClient, UpstreamError,
};
use serde_json::json;
use tokio::sync::Notify;
use tokio::time;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

fn settings() -> SchedulerSettings {
    SchedulerSettings {
        // Far enough out that tests only ever observe the first cycle.
        refresh_interval: Duration::from_secs(3600),
        today: Arc::new(fixed_date),
    }
}

fn reqwest_client() -> Arc<dyn UpstreamClient> {
    Arc::new(ReqwestUpstreamClient::new(ClientSettings::default()))
}

fn combined(server: &MockServer) -> Option<EndpointSpec> {
    Some(EndpointSpec::CombinedReport {
        url: format!("{}/api/ftrt/report", server.uri()),
    })
}

#[tokio::test]
async fn live_cycle_publishes_a_ready_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ftrt": 2.943,
            "alert_level": {"level": "critical", "color": "🔴"},
            "date": "2024-05-10",
            "energy_levels": {"transformation": 58.9}
        })))
        .mount(&server)
        .await;

    let (store, mut watcher) = ModelStore::new();
    let _scheduler = SchedulerHandle::spawn(reqwest_client(), combined(&server), settings(), store);

    assert!(watcher.changed().await);
    let snapshot = watcher.snapshot();

    assert_eq!(snapshot.status, StoreStatus::Ready);
    assert!(snapshot.last_error.is_none());
    let model = snapshot.model.expect("model present");
    assert_eq!(model.ftrt_value, 2.943);
}

#[tokio::test]
async fn unreachable_upstream_ends_the_cycle_degraded_with_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (store, mut watcher) = ModelStore::new();
    let _scheduler = SchedulerHandle::spawn(reqwest_client(), combined(&server), settings(), store);

    assert!(watcher.changed().await);
    let snapshot = watcher.snapshot();

    assert_eq!(snapshot.status, StoreStatus::ReadyDegraded);
    let error = snapshot.last_error.expect("error recorded");
    assert_eq!(error.kind, RefreshErrorKind::UpstreamUnreachable);
    let model = snapshot.model.expect("fallback model present");
    assert_eq!(*model, fallback_model(fixed_date()));
}

#[tokio::test]
async fn empty_payload_serves_fallback_without_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (store, mut watcher) = ModelStore::new();
    let _scheduler = SchedulerHandle::spawn(reqwest_client(), combined(&server), settings(), store);

    assert!(watcher.changed().await);
    let snapshot = watcher.snapshot();

    assert_eq!(snapshot.status, StoreStatus::ReadyDegraded);
    assert!(snapshot.last_error.is_none());
    assert_eq!(*snapshot.model.expect("model"), fallback_model(fixed_date()));
}

#[tokio::test]
async fn unrecognized_schema_is_recorded_on_the_degraded_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"telemetry": [1, 2, 3]})),
        )
        .mount(&server)
        .await;

    let (store, mut watcher) = ModelStore::new();
    let _scheduler = SchedulerHandle::spawn(reqwest_client(), combined(&server), settings(), store);

    assert!(watcher.changed().await);
    let snapshot = watcher.snapshot();

    assert_eq!(snapshot.status, StoreStatus::ReadyDegraded);
    assert_eq!(
        snapshot.last_error.expect("error recorded").kind,
        RefreshErrorKind::UnrecognizedSchema
    );
}

#[tokio::test]
async fn manual_refresh_during_a_cycle_does_not_duplicate_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(300))
                .set_body_json(json!({
                    "ftrt": 1.0,
                    "alert_level": {"level": "normal"},
                    "date": "2024-05-10"
                })),
        )
        .mount(&server)
        .await;

    let (store, mut watcher) = ModelStore::new();
    let scheduler = SchedulerHandle::spawn(reqwest_client(), combined(&server), settings(), store);

    // Storm of manual refreshes while the first cycle is in flight.
    scheduler.refresh();
    scheduler.refresh();
    scheduler.refresh();

    assert!(watcher.changed().await);
    assert_eq!(watcher.snapshot().status, StoreStatus::Ready);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn missing_endpoint_configuration_serves_fallback() {
    let (store, mut watcher) = ModelStore::new();
    let _scheduler = SchedulerHandle::spawn(reqwest_client(), None, settings(), store);

    assert!(watcher.changed().await);
    let snapshot = watcher.snapshot();

    assert_eq!(snapshot.status, StoreStatus::ReadyDegraded);
    let error = snapshot.last_error.expect("error recorded");
    assert_eq!(error.kind, RefreshErrorKind::UpstreamUnreachable);
    assert!(error.message.contains("no upstream endpoint"));
}

/// Client that parks until released, so tests can tear the scheduler down
/// while a cycle is in flight.
struct ParkedClient {
    release: Arc<Notify>,
}

#[async_trait::async_trait]
impl UpstreamClient for ParkedClient {
    async fn fetch(
        &self,
        _endpoint: &EndpointSpec,
        _report_date: NaiveDate,
    ) -> Result<RawReport, UpstreamError> {
        self.release.notified().await;
        Ok(RawReport {
            documents: vec![json!({
                "ftrt": 1.0,
                "alert_level": {"level": "normal"},
                "date": "2024-05-10"
            })],
        })
    }
}

#[tokio::test]
async fn teardown_mid_flight_writes_nothing_to_the_store() {
    let release = Arc::new(Notify::new());
    let client = Arc::new(ParkedClient {
        release: release.clone(),
    });
    let endpoint = Some(EndpointSpec::CombinedReport {
        url: "http://localhost:1111/api/ftrt/report".to_owned(),
    });

    let (store, watcher) = ModelStore::new();
    let scheduler = SchedulerHandle::spawn(client, endpoint, settings(), store);

    // Let the first cycle reach the parked fetch, then tear down and
    // release it.
    time::sleep(Duration::from_millis(50)).await;
    scheduler.shutdown();
    release.notify_waiters();
    time::sleep(Duration::from_millis(50)).await;

    assert_eq!(watcher.snapshot().status, StoreStatus::Loading);
    assert!(watcher.snapshot().model.is_none());
}
