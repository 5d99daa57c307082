//! End-to-end dispatch over HTTP against a wiremock server

#[path = "support.rs"]
mod support;

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier_core::{CallbackBinding, Dispatcher, RetryPolicyFactory};
use courier_domain::{Config, Request, TransportError};
use courier_infra::{build_dispatcher, HttpTransport};
use support::{eventually, RecordingCallback};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_dispatcher(max_retries: Option<u32>) -> Dispatcher {
    let mut builder = Dispatcher::builder()
        .transport(Arc::new(HttpTransport::builder().timeout(Duration::from_secs(2)).build().unwrap()));
    if let Some(retries) = max_retries {
        builder = builder.default_retry_policy(RetryPolicyFactory::default_policy(retries));
    }
    builder.build().unwrap()
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_sees_requests_in_submission_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(202)).mount(&server).await;

    let dispatcher = http_dispatcher(None);
    for i in 0..10 {
        dispatcher.submit(Request::post(format!("{}/events/{i}", server.uri()))).unwrap();
    }
    dispatcher.start();

    assert!(eventually(|| dispatcher.metrics().completed() == 10).await);
    dispatcher.shutdown().await.unwrap();

    let paths: Vec<String> =
        server.received_requests().await.unwrap().iter().map(|r| r.url.path().to_string()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("/events/{i}")).collect();
    assert_eq!(paths, expected);
}

// ============================================================================
// Retries
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = Arc::clone(&hits);
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
            if hits_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_string("done")
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let dispatcher = http_dispatcher(Some(3));
    let callback = RecordingCallback::new();
    dispatcher
        .submit_with_callback(
            Request::get(format!("{}/flaky", server.uri())),
            CallbackBinding::shared(callback.clone()),
        )
        .unwrap();
    dispatcher.start();

    assert!(eventually(|| callback.count() == 1).await);
    dispatcher.shutdown().await.unwrap();

    let outcome = &callback.outcomes()[0];
    assert!(outcome.is_success());
    assert_eq!(outcome.response().and_then(|r| r.body_text()).as_deref(), Some("done"));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_retries_report_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dispatcher = http_dispatcher(Some(2));
    let callback = RecordingCallback::new();
    dispatcher
        .submit_with_callback(Request::get(server.uri()), CallbackBinding::shared(callback.clone()))
        .unwrap();
    dispatcher.start();

    assert!(eventually(|| callback.count() == 1).await);
    dispatcher.shutdown().await.unwrap();

    let outcome = &callback.outcomes()[0];
    assert!(!outcome.is_success());
    assert_eq!(outcome.status_code(), Some(503));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_host_reports_no_response_after_one_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener); // release the port so that requests fail with ECONNREFUSED

    let dispatcher = http_dispatcher(Some(3));
    let callback = RecordingCallback::new();
    dispatcher
        .submit_with_callback(
            Request::get(format!("http://{addr}/down")),
            CallbackBinding::shared(callback.clone()),
        )
        .unwrap();
    dispatcher.start();

    assert!(eventually(|| callback.count() == 1).await);
    dispatcher.shutdown().await.unwrap();

    let outcome = &callback.outcomes()[0];
    assert!(outcome.response().is_none());
    assert!(outcome.error().is_some_and(TransportError::is_connect));
    assert_eq!(dispatcher.metrics().attempts, 1);
}

// ============================================================================
// Configuration wiring
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn build_dispatcher_applies_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.dispatcher.max_retries = Some(1);
    config.transport.log_payloads = true;

    let dispatcher = build_dispatcher(&config).unwrap();
    dispatcher.submit(Request::get(server.uri())).unwrap();
    dispatcher.start();

    assert!(eventually(|| dispatcher.metrics().completed() == 1).await);
    dispatcher.shutdown().await.unwrap();

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.attempts, 2);
    assert_eq!(metrics.retries, 1);
    assert_eq!(metrics.failed, 1);
}

#[test]
fn build_dispatcher_outside_runtime_fails() {
    let err = build_dispatcher(&Config::default()).unwrap_err();
    assert!(matches!(err, courier_domain::CourierError::InvalidInput(msg) if msg.contains("runtime")));
}
