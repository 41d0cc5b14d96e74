//! HTTP transport tests against a local mock server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use feedsync::core::client_cache::{ApiRequest, Transport};
use feedsync::core::controller::SyncController;
use feedsync::core::http::HttpTransport;
use feedsync::core::{DataType, ErrorKind, RefreshOutcome, Service};
use feedsync::test_utils::{
    RecordingConsumer, make_test_credentials, make_test_snapshot,
};
use feedsync::SyncError;
use serde_json::json;
use wiremock::matchers::{header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::logger::TestLogger;

const NOTE_PATH: &str = "/game_record/genshin/api/dailyNote";

fn note_request() -> ApiRequest {
    ApiRequest {
        data_type: DataType::GenshinDailyNote,
        path: NOTE_PATH,
        query: vec![
            ("role_id", "600000001".to_string()),
            ("server", "os_usa".to_string()),
        ],
    }
}

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(server.uri(), Duration::from_secs(5)).unwrap()
}

fn envelope(retcode: i64, message: &str, data: serde_json::Value) -> serde_json::Value {
    json!({ "retcode": retcode, "message": message, "data": data })
}

// =============================================================================
// Envelope handling
// =============================================================================

#[tokio::test]
async fn success_envelope_yields_data() {
    let log = TestLogger::new("success_envelope_yields_data");
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NOTE_PATH))
        .and(query_param("role_id", "600000001"))
        .and(query_param("server", "os_usa"))
        .and(header_regex("cookie", "ltoken_v2=v2_ltoken_acc1"))
        .and(header_regex("x-rpc-client_type", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            0,
            "OK",
            json!({"current_resin": 87}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let payload = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap();

    assert_eq!(payload, json!({"current_resin": 87}));
    log.finish_ok();
}

#[tokio::test]
async fn success_without_data_is_null() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"retcode": 0, "message": "OK"})))
        .mount(&server)
        .await;

    let payload = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap();
    assert!(payload.is_null());
}

#[tokio::test]
async fn auth_retcode_is_classified_as_auth() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            10001,
            "Please login",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::ApiError {
            code: Some(10001),
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(err.to_string().contains("Please login"));
}

#[tokio::test]
async fn rate_limit_retcode_is_classified_as_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            10101,
            "Visits too frequently",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::RateLimited { .. }));
    assert_eq!(err.kind(), ErrorKind::RateLimit);
}

#[tokio::test]
async fn other_retcodes_are_generic() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            -1,
            "Something went wrong",
            serde_json::Value::Null,
        )))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);
}

// =============================================================================
// HTTP status handling
// =============================================================================

#[tokio::test]
async fn http_429_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "42"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();

    match err {
        SyncError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(42)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn http_403_is_auth() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::ApiError {
            status: Some(403),
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn http_500_is_generic() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ParseResponse(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(0, "OK", json!({})))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Duration::from_secs(1)).unwrap();
    let err = transport
        .call(&make_test_credentials("acc1"), &note_request())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Timeout(1)));
}

// =============================================================================
// Through the controller
// =============================================================================

#[tokio::test]
async fn controller_fetches_over_http() {
    let log = TestLogger::new("controller_fetches_over_http");
    let server = MockServer::start().await;
    Mock::given(path(NOTE_PATH))
        .and(query_param("role_id", "600000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            0,
            "OK",
            json!({"current_resin": 160}),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/game_record/genshin/api/spiralAbyss"))
        .and(query_param("schedule_type", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            10001,
            "Please login",
            serde_json::Value::Null,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let controller = SyncController::builder()
        .transport(Arc::new(transport(&server)))
        .config(make_test_snapshot(&["acc1"]))
        .build()
        .unwrap();
    let consumer = RecordingConsumer::new();
    controller.register(consumer.registration(
        "w1",
        "acc1",
        vec![DataType::GenshinDailyNote, DataType::GenshinSpiralAbyss],
    ));

    log.phase("act");
    let outcome = controller.request_update("acc1", Service::Genshin).await;

    log.phase("verify");
    assert_eq!(outcome, RefreshOutcome::Committed(2));
    let note = controller
        .cached("acc1", DataType::GenshinDailyNote)
        .unwrap();
    assert_eq!(note.data(), Some(&json!({"current_resin": 160})));
    let abyss = controller
        .cached("acc1", DataType::GenshinSpiralAbyss)
        .unwrap();
    assert_eq!(abyss.error_kind(), Some(ErrorKind::Auth));
    assert_eq!(consumer.count(), 2);
    log.finish_ok();
}
