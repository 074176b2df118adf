//! HTTP client for one API resource
//!
//! Bundles resource defaults, option resolution and request execution so a
//! caller can issue `request(endpoint, overrides)` in one step.

use std::sync::Arc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::http::{
    OptionResolver,
    RequestExecutor,
    RequestOverrides,
    ResolvedResponse,
    ResourceOptions,
    RetryPolicy,
    TimeoutConfig,
    transport::{ReqwestTransport, Transport},
};
use crate::Result;

/// Configuration for the HTTP client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Retry policy for retryable statuses
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    /// Connect and request timeouts of the native transport
    #[serde(default)]
    pub timeout_config: TimeoutConfig,
}

impl HttpClientConfig {
    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.retry_policy.validate()?;
        self.timeout_config
            .validate()
            .map_err(|message| crate::Error::Configuration { message })
    }
}

/// HTTP client bound to one API resource
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Defaults applied to every request
    resource: ResourceOptions,
    /// Merges defaults with per-call overrides
    resolver: OptionResolver,
    /// Sends requests and decodes responses
    executor: RequestExecutor,
}

impl HttpClient {
    /// Create a client for a resource using the native transport
    pub fn new(resource: ResourceOptions, config: HttpClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout_config.clone())?;
        Self::with_transport(resource, Arc::new(transport), config.retry_policy)
    }

    /// Create with default configuration
    pub fn with_default_config(resource: ResourceOptions) -> Result<Self> {
        Self::new(resource, HttpClientConfig::default())
    }

    /// Create a client on top of any transport.
    ///
    /// The transport's capabilities decide whether TLS bypass requests can
    /// be honoured.
    pub fn with_transport(
        resource: ResourceOptions,
        transport: Arc<dyn Transport>,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        retry_policy.validate()?;
        if let Some(auth) = &resource.auth {
            auth.validate()?;
        }

        let resolver = OptionResolver::new(transport.capabilities());
        let executor = RequestExecutor::new(transport).with_retry_policy(retry_policy);

        Ok(Self {
            resource,
            resolver,
            executor,
        })
    }

    /// Resolve options for `endpoint` and execute the request
    pub async fn request(&self, endpoint: &str, overrides: RequestOverrides) -> Result<ResolvedResponse> {
        let options = self.resolver.resolve(&self.resource, overrides);
        self.executor.execute(endpoint, &options).await
    }

    /// `GET` an endpoint
    pub async fn get(&self, endpoint: &str) -> Result<ResolvedResponse> {
        self.request(endpoint, RequestOverrides::new()).await
    }

    /// `POST` a JSON body to an endpoint
    pub async fn post(&self, endpoint: &str, body: Value) -> Result<ResolvedResponse> {
        self.request(endpoint, RequestOverrides::new().method(Method::POST).json(body))
            .await
    }

    /// `PUT` a JSON body to an endpoint
    pub async fn put(&self, endpoint: &str, body: Value) -> Result<ResolvedResponse> {
        self.request(endpoint, RequestOverrides::new().method(Method::PUT).json(body))
            .await
    }

    /// `DELETE` an endpoint
    pub async fn delete(&self, endpoint: &str) -> Result<ResolvedResponse> {
        self.request(endpoint, RequestOverrides::new().method(Method::DELETE))
            .await
    }

    /// Get a reference to the resource defaults
    pub fn resource(&self) -> &ResourceOptions {
        &self.resource
    }

    pub fn resolver(&self) -> &OptionResolver {
        &self.resolver
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }
}
