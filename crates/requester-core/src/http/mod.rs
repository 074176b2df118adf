//! HTTP transport for REST API resources
//!
//! This module provides the request pipeline with:
//! - Option resolution from resource defaults and per-call overrides
//! - Token authentication headers
//! - URL construction and request modes
//! - Retry logic with exponential backoff for retryable statuses
//! - Content-type based response decoding
//! - Normalization of failed responses into errors

pub mod auth;
pub mod builder;
pub mod client;
pub mod error;
pub mod executor;
pub mod options;
pub mod response;
pub mod retry;
pub mod timeout;
pub mod tls;
pub mod transport;

pub use auth::AuthToken;
pub use builder::{build_url, request_mode, PreparedRequest, RequestMode};
pub use client::{HttpClient, HttpClientConfig};
pub use executor::RequestExecutor;
pub use options::{
    OptionResolver, RequestBody, RequestOptions, RequestOverrides, ResourceOptions, SearchParams,
};
pub use response::{Blob, ByteStream, ResolvedResponse, ResponseBody};
pub use retry::{RetryDecision, RetryHandler, RetryPolicy};
pub use timeout::TimeoutConfig;
pub use tls::TransportCapabilities;
pub use transport::{ReqwestTransport, Transport, TransportError};

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
