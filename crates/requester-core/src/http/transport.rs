//! Network transport abstraction
//!
//! The executor talks to the network through the [`Transport`] trait so the
//! request pipeline can run against any HTTP stack. [`ReqwestTransport`] is
//! the native implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, ClientBuilder};
use crate::http::builder::{PreparedRequest, RequestMode};
use crate::http::options::RequestBody;
use crate::http::timeout::TimeoutConfig;
use crate::http::tls::TransportCapabilities;

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Failure of the network exchange itself, before any status is known
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("request was aborted")]
    Aborted,

    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransportError {
    /// Create a failure without an underlying source
    pub fn failed(message: impl Into<String>) -> Self {
        TransportError::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this failure is a timeout or an abort
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Aborted)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return TransportError::Timeout;
        }

        TransportError::Failed {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

impl From<TransportError> for crate::Error {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout | TransportError::Aborted => crate::Error::TransportTimeout,
            TransportError::Failed { message, source } => crate::Error::Transport { message, source },
        }
    }
}

/// Sends prepared requests over the network
#[async_trait]
pub trait Transport: Send + Sync {
    /// What the host this transport runs in supports
    fn capabilities(&self) -> TransportCapabilities;

    /// Perform one network exchange
    async fn send(&self, request: &PreparedRequest) -> Result<reqwest::Response, TransportError>;
}

/// Native transport backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Client for requests without special TLS or redirect needs
    client: Client,
    timeouts: TimeoutConfig,
}

impl ReqwestTransport {
    /// Create a transport with the given timeouts
    pub fn new(timeouts: TimeoutConfig) -> crate::Result<Self> {
        timeouts
            .validate()
            .map_err(|message| crate::Error::Configuration { message })?;

        let client = Self::client_builder(&timeouts)
            .build()
            .map_err(|e| crate::Error::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, timeouts })
    }

    /// Create a transport with default timeouts
    pub fn with_default_config() -> crate::Result<Self> {
        Self::new(TimeoutConfig::default())
    }

    fn client_builder(timeouts: &TimeoutConfig) -> ClientBuilder {
        let mut builder = Client::builder().connect_timeout(timeouts.connect_timeout);
        if let Some(timeout) = timeouts.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Pick the client for one request.
    ///
    /// Certificate bypass and same-origin redirects are client-wide settings
    /// in reqwest, so such requests get a dedicated client.
    fn client_for(&self, request: &PreparedRequest) -> Result<Client, TransportError> {
        if !request.accept_invalid_certs && request.mode == RequestMode::Cors {
            return Ok(self.client.clone());
        }

        let mut builder = Self::client_builder(&self.timeouts)
            .danger_accept_invalid_certs(request.accept_invalid_certs);

        if request.mode == RequestMode::SameOrigin {
            builder = builder.redirect(same_origin_redirects());
        }

        builder.build().map_err(TransportError::from)
    }
}

/// Follow redirects only while they stay on the origin of the first request
fn same_origin_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        let leaves_origin = attempt
            .previous()
            .first()
            .map(|first| first.origin() != attempt.url().origin())
            .unwrap_or(false);

        if leaves_origin {
            attempt.stop()
        } else if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

fn header_map(request: &PreparedRequest) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::with_capacity(request.headers.len());

    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Failed {
                message: format!("Invalid header name: {}", name),
                source: Some(Box::new(e)),
            })?;
        let value = HeaderValue::from_str(value).map_err(|e| TransportError::Failed {
            message: format!("Invalid value for header {}", name),
            source: Some(Box::new(e)),
        })?;
        headers.insert(name, value);
    }

    Ok(headers)
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::native()
    }

    async fn send(&self, request: &PreparedRequest) -> Result<reqwest::Response, TransportError> {
        let client = self.client_for(request)?;

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(header_map(request)?);

        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Text(text)) => builder.body(text.clone()),
            Some(RequestBody::Bytes(bytes)) => builder.body(bytes.clone()),
            None => builder,
        };

        tracing::trace!(url = %request.url, method = %request.method, "sending request");

        builder.send().await.map_err(TransportError::from)
    }
}
