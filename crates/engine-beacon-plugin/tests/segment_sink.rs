//! Segment sink against a local HTTP endpoint.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;

use engine_beacon_core::LabelMap;
use engine_beacon_plugin::config::AnalyticsSection;
use engine_beacon_plugin::sink::{self, SegmentSink};
use engine_beacon_plugin::{AnalyticsSink, ConfigError, ForwardError, Identify};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>,
}

async fn spawn_endpoint(status: StatusCode) -> (SocketAddr, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/v1/identify",
            post(move |State(c): State<Captured>, headers: HeaderMap, body: String| async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                c.requests.lock().unwrap().push((auth, serde_json::from_str(&body).unwrap()));
                status
            }),
        )
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, captured)
}

fn section(addr: SocketAddr) -> AnalyticsSection {
    AnalyticsSection {
        endpoint: format!("http://{addr}/"),
        write_key: "k".into(),
        timeout_ms: 2000,
    }
}

fn event() -> Identify {
    let mut traits = LabelMap::new();
    traits.insert("id".into(), "abc".into());
    traits.insert("driver".into(), "overlay2".into());
    Identify {
        user_id: "abc".into(),
        traits,
    }
}

#[tokio::test]
async fn posts_identify_with_basic_auth() {
    let (addr, captured) = spawn_endpoint(StatusCode::OK).await;
    let sink = SegmentSink::new(&section(addr)).unwrap();
    assert_eq!(sink.url(), format!("http://{addr}/v1/identify"));

    sink.identify(event()).await.unwrap();

    let requests = captured.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    // base64("k:")
    assert_eq!(auth.as_deref(), Some("Basic azo="));
    assert_eq!(body["type"], "identify");
    assert_eq!(body["userId"], "abc");
    assert_eq!(body["traits"]["driver"], "overlay2");
    assert_eq!(body["traits"]["id"], "abc");
    assert_eq!(body["context"]["library"]["name"], "engine-beacon");
    assert!(!body["messageId"].as_str().unwrap().is_empty());
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn non_success_status_is_rejected() {
    let (addr, _captured) = spawn_endpoint(StatusCode::BAD_REQUEST).await;
    let sink = SegmentSink::new(&section(addr)).unwrap();

    let err = sink.identify(event()).await.unwrap_err();
    assert!(matches!(err, ForwardError::Rejected { status: 400 }), "{err}");
    assert_eq!(err.kind().as_str(), "forward");
}

#[tokio::test]
async fn unreachable_endpoint_is_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = SegmentSink::new(&section(addr)).unwrap();
    let err = sink.identify(event()).await.unwrap_err();
    assert!(matches!(err, ForwardError::Request(_)), "{err}");
}

#[tokio::test]
async fn empty_write_key_selects_log_sink() {
    let cfg = AnalyticsSection::default();
    let sink = sink::from_config(&cfg).unwrap();
    sink.identify(event()).await.unwrap();
}

#[tokio::test]
async fn sink_setup_reports_config_errors() {
    let cfg = AnalyticsSection {
        write_key: "k".into(),
        ..AnalyticsSection::default()
    };
    let built: Result<SegmentSink, ConfigError> = SegmentSink::new(&cfg);
    assert_eq!(built.unwrap().url(), "https://api.segment.io/v1/identify");

    let chosen: Result<Arc<dyn AnalyticsSink>, ConfigError> = sink::from_config(&cfg);
    assert!(chosen.is_ok());
}
