//! Request execution with bounded retries
//!
//! Builds the request once, then sends it until the server answers with a
//! status outside the retryable set or the attempt budget runs out. Ok
//! responses are decoded, every other status is normalized into an error.

use std::sync::Arc;
use tracing::debug;
use crate::http::builder::PreparedRequest;
use crate::http::error::normalize_failure;
use crate::http::options::RequestOptions;
use crate::http::response::{parse_response, ResolvedResponse};
use crate::http::retry::{RetryDecision, RetryHandler, RetryPolicy};
use crate::http::transport::Transport;
use crate::{Error, Result};

/// Executes resolved requests against a transport
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy,
}

impl RequestExecutor {
    /// Create an executor with the default retry policy
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send `endpoint` with `options` and decode the response
    #[tracing::instrument(skip(self, options), fields(method = %options.method))]
    pub async fn execute(&self, endpoint: &str, options: &RequestOptions) -> Result<ResolvedResponse> {
        let request = PreparedRequest::build(endpoint, options)?;
        let mut handler = RetryHandler::new(self.retry_policy.clone());

        loop {
            handler.record_attempt();
            debug!(
                attempt = handler.attempts(),
                url = %request.url,
                mode = ?request.mode,
                "issuing request"
            );

            let response = self.transport.send(&request).await.map_err(Error::from)?;
            let status = response.status();

            if status.is_success() {
                debug!(status = status.as_u16(), "request succeeded");
                return parse_response(response, options.as_stream).await;
            }

            match handler.should_retry(status.as_u16()) {
                RetryDecision::Retry { delay } => {
                    drop(response);
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::NoRetry => {
                    debug!(status = status.as_u16(), "request failed");
                    return Err(normalize_failure(response).await);
                }
                RetryDecision::Exhausted => {
                    return Err(Error::RetryExhausted {
                        attempts: handler.attempts(),
                        last_status: status.as_u16(),
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use serde_json::json;
    use crate::http::builder::RequestMode;
    use crate::http::tls::TransportCapabilities;
    use crate::http::transport::TransportError;

    /// Replays canned responses and records what was sent
    struct CannedTransport {
        responses: Mutex<VecDeque<std::result::Result<(u16, &'static str, &'static str), TransportError>>>,
        sent: Mutex<Vec<PreparedRequest>>,
    }

    impl CannedTransport {
        fn new(
            responses: Vec<std::result::Result<(u16, &'static str, &'static str), TransportError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<PreparedRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        fn capabilities(&self) -> TransportCapabilities {
            TransportCapabilities::native()
        }

        async fn send(&self, request: &PreparedRequest) -> std::result::Result<reqwest::Response, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            let (status, content_type, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no canned response left")?;

            Ok(reqwest::Response::from(
                http::Response::builder()
                    .status(status)
                    .header("content-type", content_type)
                    .body(body)
                    .unwrap(),
            ))
        }
    }

    fn options() -> RequestOptions {
        RequestOptions {
            prefix_url: Some("http://test.com/projects".to_string()),
            search_params: Some("test=4".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let transport = CannedTransport::new(vec![Ok((200, "application/json", r#"{"id": 123}"#))]);
        let executor = RequestExecutor::new(transport.clone());

        let response = executor.execute("testurl/123", &options()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_json(), Some(&json!({"id": 123})));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url.as_str(), "http://test.com/projects/testurl/123?test=4");
        assert_eq!(sent[0].mode, RequestMode::Cors);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_statuses_are_retried() {
        let transport = CannedTransport::new(vec![
            Ok((429, "text/plain", "slow down")),
            Ok((502, "text/html", "bad gateway")),
            Ok((200, "text/plain", "done")),
        ]);
        let executor = RequestExecutor::new(transport.clone());

        let response = executor.execute("testurl/123", &options()).await.unwrap();

        assert_eq!(response.body.as_text(), Some("done"));
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_not_retried() {
        let transport = CannedTransport::new(vec![Ok((501, "application/json", r#"{"error": "msg"}"#))]);
        let executor = RequestExecutor::new(transport.clone());

        let err = executor.execute("testurl/123", &options()).await.unwrap_err();

        assert_eq!(err.to_string(), "Not Implemented");
        assert_eq!(err.cause().unwrap().description, "\"msg\"");
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let transport = CannedTransport::new(vec![Err(TransportError::Timeout)]);
        let executor = RequestExecutor::new(transport.clone());

        let err = executor.execute("testurl/123", &options()).await.unwrap_err();

        assert!(matches!(err, Error::TransportTimeout));
        assert_eq!(err.to_string(), "Query timeout was reached");
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_sending() {
        let transport = CannedTransport::new(vec![]);
        let executor = RequestExecutor::new(transport.clone());

        let err = executor
            .execute("projects", &RequestOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidUrl { .. }));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let transport = CannedTransport::new(vec![Ok((429, "text/plain", ""))]);
        let executor = RequestExecutor::new(transport.clone()).with_retry_policy(RetryPolicy::new(1));

        let err = executor.execute("testurl/123", &options()).await.unwrap_err();

        assert!(matches!(err, Error::RetryExhausted { attempts: 1, last_status: 429 }));
        assert_eq!(transport.sent().len(), 1);
    }
}
