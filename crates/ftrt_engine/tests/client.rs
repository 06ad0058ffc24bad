use std::time::Duration;

use chrono::NaiveDate;
use ftrt_engine::{ClientSettings, EndpointSpec, ReqwestUpstreamClient, UpstreamClient, UpstreamError};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

fn combined(server: &MockServer) -> EndpointSpec {
    EndpointSpec::CombinedReport {
        url: format!("{}/api/ftrt/report", server.uri()),
    }
}

fn paired(server: &MockServer) -> EndpointSpec {
    EndpointSpec::Paired {
        current_url: format!("{}/ftrt/actual", server.uri()),
        prediction_url: format!("{}/ftrt/prediccion", server.uri()),
        horizon_days: 30,
    }
}

#[tokio::test]
async fn combined_report_posts_the_date_and_returns_one_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .and(body_json(json!({"date": "2024-05-10"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ftrt": 2.943,
            "alert_level": {"level": "critical", "color": "🔴"},
            "date": "2024-05-10"
        })))
        .mount(&server)
        .await;

    let client = ReqwestUpstreamClient::new(ClientSettings::default());
    let report = client
        .fetch(&combined(&server), report_date())
        .await
        .expect("fetch ok");

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0]["ftrt"], json!(2.943));
}

#[tokio::test]
async fn non_2xx_response_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = ReqwestUpstreamClient::new(ClientSettings::default());
    let err = client
        .fetch(&combined(&server), report_date())
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Unreachable(_)), "{err}");
}

#[tokio::test]
async fn slow_response_times_out_as_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({})),
        )
        .mount(&server)
        .await;

    let settings = ClientSettings {
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    };
    let client = ReqwestUpstreamClient::new(settings);
    let err = client
        .fetch(&combined(&server), report_date())
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Unreachable(_)), "{err}");
}

#[tokio::test]
async fn unparsable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ftrt/report"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = ReqwestUpstreamClient::new(ClientSettings::default());
    let err = client
        .fetch(&combined(&server), report_date())
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Malformed(_)), "{err}");
}

#[tokio::test]
async fn paired_endpoints_return_current_then_prediction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ftrt/actual"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ftrt_valor": 1.34,
            "nivel_riesgo": "MODERADO"
        })))
        .mount(&server)
        .await;
    // The horizon is appended to the prediction URL as a path segment.
    Mock::given(method("GET"))
        .and(path("/ftrt/prediccion/30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valores_diarios": [{"fecha": "2024-05-11", "ftrt": 1.2}],
            "alertas": []
        })))
        .mount(&server)
        .await;

    let client = ReqwestUpstreamClient::new(ClientSettings::default());
    let report = client
        .fetch(&paired(&server), report_date())
        .await
        .expect("fetch ok");

    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.documents[0]["ftrt_valor"], json!(1.34));
    assert!(report.documents[1]["valores_diarios"].is_array());
}

#[tokio::test]
async fn paired_partial_failure_fails_the_whole_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ftrt/actual"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ftrt_valor": 1.34,
            "nivel_riesgo": "MODERADO"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ftrt/prediccion/30"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ReqwestUpstreamClient::new(ClientSettings::default());
    let err = client
        .fetch(&paired(&server), report_date())
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Unreachable(_)), "{err}");
}

#[tokio::test]
async fn invalid_url_is_unreachable() {
    let client = ReqwestUpstreamClient::new(ClientSettings::default());
    let endpoint = EndpointSpec::CombinedReport {
        url: "not a url".to_owned(),
    };

    let err = client.fetch(&endpoint, report_date()).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Unreachable(_)), "{err}");
}
