//! End-to-end cycles against mocked search and messaging endpoints

use std::time::Duration;

use apmwatch::models::GateOutcome;
use apmwatch::scheduler::Monitor;
use apmwatch::{Config, Error};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Tehran;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/apm-transactions/_search";
const SMS_PATH: &str = "/api/sendpatternmessage";

fn config(apm: &MockServer, sms: &MockServer, extra: &[(&str, &str)]) -> Config {
    let sms_url = format!("{}{SMS_PATH}", sms.uri());
    let apm_url = apm.uri();
    let mut builder = ::config::Config::builder();
    let base = [
        ("sms_key", "test-key"),
        ("sender_number", "10001000"),
        ("receiver_number", "09120000000"),
        ("query_url", apm_url.as_str()),
        ("index_pattern", "apm-transactions"),
        ("sms_api_url", sms_url.as_str()),
        ("latency_threshold_ms", "500"),
        ("request_timeout", "2s"),
    ];
    for (key, value) in base.iter().chain(extra) {
        builder = builder.set_override(*key, *value).unwrap();
    }
    Config::from_source(&builder.build().unwrap()).unwrap()
}

fn business_hours() -> DateTime<Utc> {
    Tehran
        .with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn search_body() -> serde_json::Value {
    json!({
        "took": 4,
        "hits": {
            "hits": [
                {"_source": {"transaction": {"name": "checkout", "duration.histogram": {"values": [600000.0]}}}},
                {"_source": {"transaction": {"name": "checkout", "duration.histogram": {"values": [700000.0]}}}},
                {"_source": {"transaction": {"name": "search", "duration.histogram": {"values": [100000.0]}}}}
            ]
        }
    })
}

async fn mount_search(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_breach_sends_one_sms() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "query": {"bool": {"filter": [
                {"range": {"@timestamp": {
                    "gte": "2024-05-01T09:55:00+03:30",
                    "lte": "2024-05-01T10:00:00+03:30"
                }}},
                {"term": {"service.name": "production-search-afra"}}
            ]}},
            "size": 10000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&apm)
        .await;

    Mock::given(method("POST"))
        .and(path(SMS_PATH))
        .and(header("ApiKey", "test-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "OtpId": "673",
            "ReplaceToken": [],
            "SenderNumber": "10001000",
            "MobileNumber": "09120000000"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&sms)
        .await;

    let monitor = Monitor::new(&config(&apm, &sms, &[])).unwrap();
    let now = business_hours();

    let report = monitor.run_cycle(now).await.unwrap();

    assert_eq!(report.sample_count, 3);
    assert!((report.aggregates["checkout"].mean_ms() - 650.0).abs() < 1e-9);
    assert!((report.aggregates["search"].mean_ms() - 100.0).abs() < 1e-9);
    assert!(report.decision.should_alert());
    assert_eq!(report.decision.offenders.len(), 1);
    assert_eq!(report.outcome, GateOutcome::Sent { at: now });
}

#[tokio::test]
async fn test_cooldown_suppresses_second_cycle() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(&apm, ResponseTemplate::new(200).set_body_json(search_body())).await;

    Mock::given(method("POST"))
        .and(path(SMS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&sms)
        .await;

    let monitor = Monitor::new(&config(&apm, &sms, &[])).unwrap();
    let t0 = business_hours();

    let first = monitor.run_cycle(t0).await.unwrap();
    let second = monitor.run_cycle(t0 + chrono::Duration::minutes(5)).await.unwrap();
    let third = monitor.run_cycle(t0 + chrono::Duration::minutes(31)).await.unwrap();

    assert!(matches!(first.outcome, GateOutcome::Sent { .. }));
    assert!(matches!(second.outcome, GateOutcome::Suppressed { .. }));
    assert!(matches!(third.outcome, GateOutcome::Sent { .. }));
}

#[tokio::test]
async fn test_failed_sms_is_retried_next_cycle() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(&apm, ResponseTemplate::new(200).set_body_json(search_body())).await;

    Mock::given(method("POST"))
        .and(path(SMS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(2)
        .mount(&sms)
        .await;

    let monitor = Monitor::new(&config(&apm, &sms, &[])).unwrap();
    let t0 = business_hours();

    let first = monitor.run_cycle(t0).await.unwrap();
    let second = monitor.run_cycle(t0 + chrono::Duration::minutes(1)).await.unwrap();

    match first.outcome {
        GateOutcome::DeliveryFailed { error } => assert!(error.contains("401")),
        other => panic!("expected delivery failure, got {other:?}"),
    }
    assert!(matches!(second.outcome, GateOutcome::DeliveryFailed { .. }));
    assert_eq!(monitor.gate().last_sent_at().await, None);
}

#[tokio::test]
async fn test_empty_hits_never_alert() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(
        &apm,
        ResponseTemplate::new(200).set_body_json(json!({"hits": {"hits": []}})),
    )
    .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&sms)
        .await;

    let monitor = Monitor::new(&config(&apm, &sms, &[])).unwrap();

    let report = monitor.run_cycle(business_hours()).await.unwrap();

    assert_eq!(report.sample_count, 0);
    assert!(report.aggregates.is_empty());
    assert!(!report.decision.should_alert());
    assert_eq!(report.outcome, GateOutcome::NotTriggered);
}

#[tokio::test]
async fn test_backend_500_is_response_error() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(&apm, ResponseTemplate::new(500).set_body_string("shard failure")).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&sms)
        .await;

    let monitor = Monitor::new(&config(&apm, &sms, &[])).unwrap();

    let err = monitor.run_cycle(business_hours()).await.unwrap_err();

    match err {
        Error::Response { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "shard failure");
        }
        other => panic!("expected response error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_backend_500_still_schedules_next_tick() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(&apm, ResponseTemplate::new(500)).await;

    let monitor = Monitor::new(&config(&apm, &sms, &[("poll_interval", "5m")])).unwrap();

    let delay = monitor.tick(business_hours()).await;

    assert_eq!(delay, Duration::from_secs(300));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(&apm, ResponseTemplate::new(200).set_body_string("<html>gateway</html>")).await;

    let monitor = Monitor::new(&config(&apm, &sms, &[])).unwrap();

    let err = monitor.run_cycle(business_hours()).await.unwrap_err();

    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    let mut config = config(&apm, &sms, &[]);
    config.apm.base_url = "http://127.0.0.1:1".to_string();

    let monitor = Monitor::new(&config).unwrap();

    let err = monitor.run_cycle(business_hours()).await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn test_outside_window_skips_backend() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(0)
        .mount(&apm)
        .await;

    let monitor = Monitor::new(&config(
        &apm,
        &sms,
        &[("poll_interval", "5m"), ("off_hours_delay", "25m")],
    ))
    .unwrap();
    let three_am = Tehran
        .with_ymd_and_hms(2024, 5, 1, 3, 0, 0)
        .unwrap()
        .with_timezone(&Utc);

    let delay = monitor.tick(three_am).await;

    assert_eq!(delay, Duration::from_secs(30 * 60));
}

#[tokio::test]
async fn test_disabled_window_runs_around_the_clock() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {"hits": []}})))
        .expect(1)
        .mount(&apm)
        .await;

    let monitor = Monitor::new(&config(
        &apm,
        &sms,
        &[("monitoring_window_enabled", "false"), ("poll_interval", "1m")],
    ))
    .unwrap();
    let three_am = Tehran
        .with_ymd_and_hms(2024, 5, 1, 3, 0, 0)
        .unwrap()
        .with_timezone(&Utc);

    let delay = monitor.tick(three_am).await;

    assert_eq!(delay, Duration::from_secs(60));
}

#[tokio::test]
async fn test_unreachable_sms_endpoint_is_delivery_failure() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(&apm, ResponseTemplate::new(200).set_body_json(search_body())).await;

    let monitor = Monitor::new(&config(
        &apm,
        &sms,
        &[("sms_api_url", "http://127.0.0.1:1/api/sendpatternmessage")],
    ))
    .unwrap();

    let report = monitor.run_cycle(business_hours()).await.unwrap();

    match report.outcome {
        GateOutcome::DeliveryFailed { error } => assert!(error.starts_with("HTTP error")),
        other => panic!("expected delivery failure, got {other:?}"),
    }
    assert_eq!(monitor.gate().last_sent_at().await, None);
}

#[tokio::test]
async fn test_non_200_success_status_is_delivery_failure() {
    let apm = MockServer::start().await;
    let sms = MockServer::start().await;
    mount_search(&apm, ResponseTemplate::new(200).set_body_json(search_body())).await;

    Mock::given(method("POST"))
        .and(path(SMS_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&sms)
        .await;

    let monitor = Monitor::new(&config(&apm, &sms, &[])).unwrap();

    let report = monitor.run_cycle(business_hours()).await.unwrap();

    match report.outcome {
        GateOutcome::DeliveryFailed { error } => assert!(error.contains("204")),
        other => panic!("expected delivery failure, got {other:?}"),
    }
    assert_eq!(monitor.gate().last_sent_at().await, None);
}
