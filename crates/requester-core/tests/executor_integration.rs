//! Integration tests for the request executor
//!
//! A scripted transport replays responses so retry sequencing, backoff
//! timing and body decoding can be checked without a network. Backoff is
//! measured on a paused tokio clock.


use requester_core::http::{
    OptionResolver, RequestExecutor, RequestMode, RequestOverrides, ResourceOptions, RetryPolicy,
    TransportCapabilities, TransportError,
};
use requester_core::{Error, RequestOptions};
use serde_json::json;
use test_support::{respond, status, Scripted, ScriptedTransport};

fn options() -> RequestOptions {
    RequestOptions {
        prefix_url: Some("http://test.com/projects".to_string()),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_success() {
    let transport = ScriptedTransport::new(vec![
        status(429),
        status(502),
        respond(200, "application/json", r#"{"name": "demo"}"#),
    ]);
    let executor = RequestExecutor::new(transport.clone());

    let response = executor.execute("1", &options()).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_json(), Some(&json!({"name": "demo"})));
    assert_eq!(transport.calls(), 3);
    assert_eq!(transport.gaps_ms(), vec![100, 200]);
}

#[tokio::test(start_paused = true)]
async fn test_retries_are_exhausted_after_ten_attempts() {
    let transport = ScriptedTransport::new((0..10).map(|_| status(429)).collect());
    let executor = RequestExecutor::new(transport.clone());

    let err = executor.execute("1", &options()).await.unwrap_err();

    assert!(matches!(err, Error::RetryExhausted { attempts: 10, last_status: 429 }));
    assert_eq!(err.to_string(), "Could not successfully complete this request");
    assert_eq!(transport.calls(), 10);
    assert_eq!(
        transport.gaps_ms(),
        vec![100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600]
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_policy() {
    let transport = ScriptedTransport::new(vec![status(503), status(503), status(204)]);
    let policy = RetryPolicy::new(3)
        .with_retryable_statuses([503])
        .with_base_delay(std::time::Duration::from_millis(10))
        .with_multiplier(3.0);
    let executor = RequestExecutor::new(transport.clone()).with_retry_policy(policy);

    let response = executor.execute("1", &options()).await.unwrap();

    assert!(response.body.is_null());
    assert_eq!(transport.gaps_ms(), vec![10, 30]);
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let transport = ScriptedTransport::new(vec![respond(
        501,
        "application/json",
        r#"{"error": "msg"}"#,
    )]);
    let executor = RequestExecutor::new(transport.clone());

    let err = executor.execute("1", &options()).await.unwrap_err();

    assert_eq!(err.to_string(), "Not Implemented");
    let cause = err.cause().unwrap();
    assert_eq!(cause.description, "\"msg\"");
    assert_eq!(cause.response.status, 501);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_text_error_body_is_used_verbatim() {
    let transport = ScriptedTransport::new(vec![respond(404, "text/plain", "404 Project Not Found")]);
    let executor = RequestExecutor::new(transport.clone());

    let err = executor.execute("1", &options()).await.unwrap_err();

    assert_eq!(err.to_string(), "Not Found");
    assert_eq!(err.cause().unwrap().description, "404 Project Not Found");
}

#[tokio::test]
async fn test_malformed_json_error_body_passes_through() {
    let transport = ScriptedTransport::new(vec![respond(500, "application/json", "<html>")]);
    let executor = RequestExecutor::new(transport.clone());

    let err = executor.execute("1", &options()).await.unwrap_err();

    assert!(matches!(err, Error::MalformedErrorBody { .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_transport_failures_are_not_retried() {
    let transport = ScriptedTransport::new(vec![Scripted::Fail(TransportError::Aborted)]);
    let executor = RequestExecutor::new(transport.clone());
    let err = executor.execute("1", &options()).await.unwrap_err();
    assert!(matches!(err, Error::TransportTimeout));
    assert_eq!(transport.calls(), 1);

    let transport = ScriptedTransport::new(vec![Scripted::Fail(TransportError::failed(
        "connection refused",
    ))]);
    let executor = RequestExecutor::new(transport.clone());
    let err = executor.execute("1", &options()).await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_body_decoding_by_content_type() {
    let transport = ScriptedTransport::new(vec![
        respond(200, "application/json; charset=utf-8", ""),
        respond(200, "text/plain", ""),
        respond(200, "application/octet-stream", vec![0u8; 42]),
        status(200),
        respond(204, "application/json", ""),
    ]);
    let executor = RequestExecutor::new(transport.clone());

    let json_body = executor.execute("a", &options()).await.unwrap().body;
    assert_eq!(json_body.as_json(), Some(&json!({})));

    let text_body = executor.execute("b", &options()).await.unwrap().body;
    assert_eq!(text_body.as_text(), Some(""));

    let blob_body = executor.execute("c", &options()).await.unwrap().body;
    assert_eq!(blob_body.as_blob().unwrap().size(), 42);

    let untyped_body = executor.execute("d", &options()).await.unwrap().body;
    assert_eq!(untyped_body.as_blob().unwrap().size(), 0);

    let no_content = executor.execute("e", &options()).await.unwrap().body;
    assert!(no_content.is_null());
}

#[tokio::test]
async fn test_url_and_mode_of_sent_requests() {
    let transport = ScriptedTransport::new(vec![status(200), status(200), status(200)]);
    let executor = RequestExecutor::new(transport.clone());

    for prefix in ["http://test.com/projects", "http://test.com/projects/"] {
        let options = RequestOptions {
            prefix_url: Some(prefix.to_string()),
            search_params: Some("test=4".to_string()),
            ..Default::default()
        };
        executor.execute("testurl/123", &options).await.unwrap();
    }
    executor
        .execute("testurl/123/repository/archive", &options())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].url.as_str(), "http://test.com/projects/testurl/123?test=4");
    assert_eq!(requests[1].url.as_str(), "http://test.com/projects/testurl/123?test=4");
    assert_eq!(requests[0].mode, RequestMode::Cors);
    assert_eq!(requests[2].mode, RequestMode::SameOrigin);
}

#[tokio::test]
async fn test_resolved_options_reach_the_transport() {
    let transport = ScriptedTransport::with_capabilities(
        vec![status(200), status(200)],
        TransportCapabilities::native(),
    );
    let executor = RequestExecutor::new(transport.clone());
    let resource = ResourceOptions::new("https://gitlab.example.com/api/v4")
        .with_header("X-Client", "requester")
        .with_reject_unauthorized(false);

    let native = OptionResolver::new(TransportCapabilities::native());
    let options = native.resolve(&resource, RequestOverrides::new().query([("page", "2")]));
    executor.execute("projects", &options).await.unwrap();

    let sandboxed = OptionResolver::new(TransportCapabilities::sandboxed());
    let options = sandboxed.resolve(&resource, RequestOverrides::new());
    executor.execute("projects", &options).await.unwrap();

    let requests = transport.requests();
    assert_eq!(
        requests[0].url.as_str(),
        "https://gitlab.example.com/api/v4/projects?page=2"
    );
    assert_eq!(requests[0].headers["x-client"], "requester");
    assert!(requests[0].accept_invalid_certs);
    assert!(!requests[1].accept_invalid_certs);
}
