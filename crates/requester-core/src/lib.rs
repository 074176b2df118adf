//! Requester Core - HTTP transport for generated REST API clients
//!
//! This crate turns a logical endpoint plus request options into a parsed
//! response. It resolves options, builds the target URL, retries transient
//! failures with exponential backoff, decodes bodies by content type and
//! normalizes failed responses into errors.
//!
//! # Main Components
//!
//! - **Option Resolver**: merges resource defaults with per-call overrides
//! - **Request Executor**: sends requests with bounded retries and decodes responses
//! - **Error Handling**: a single [`Error`] type built with `thiserror`
//!
//! # Example
//!
//! ```no_run
//! use requester_core::http::{AuthToken, HttpClient, RequestOverrides, ResourceOptions};
//!
//! async fn example() -> requester_core::Result<()> {
//!     let resource = ResourceOptions::new("https://gitlab.example.com/api/v4")
//!         .with_auth(AuthToken::Private("glpat-token".to_string()));
//!     let client = HttpClient::with_default_config(resource)?;
//!
//!     let response = client
//!         .request("projects", RequestOverrides::new().query([("per_page", "5")]))
//!         .await?;
//!     println!("{} {:?}", response.status, response.body.as_json());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;

// Re-export main types for convenience
pub use error::{Error, FailedResponse, FailureCause, Result};
pub use http::{
    HttpClient, HttpClientConfig, OptionResolver, RequestExecutor, RequestOptions,
    RequestOverrides, ResolvedResponse, ResourceOptions, ResponseBody, RetryPolicy,
    TransportCapabilities,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }
}
