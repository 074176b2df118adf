//! Request construction from an endpoint and resolved options
//!
//! Resolves the endpoint against the prefix URL, applies the query string and
//! picks the request mode. The result, a [`PreparedRequest`], is plain data
//! that any [`Transport`](crate::http::transport::Transport) can send.

use std::collections::BTreeMap;
use reqwest::Method;
use url::Url;
use crate::http::options::{RequestBody, RequestOptions};
use crate::Result;

/// Endpoints containing this segment download repository archives
pub const ARCHIVE_ENDPOINT_PATTERN: &str = "repository/archive";

/// Cross-origin policy of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Unrestricted cross-origin requests
    #[default]
    Cors,
    /// Credentials are only sent to the origin the request was issued for
    SameOrigin,
}

/// Pick the request mode for an endpoint
pub fn request_mode(endpoint: &str) -> RequestMode {
    if endpoint.contains(ARCHIVE_ENDPOINT_PATTERN) {
        RequestMode::SameOrigin
    } else {
        RequestMode::Cors
    }
}

/// Build the target URL of a request.
///
/// A prefix without a trailing `/` gets one appended first, so relative
/// endpoints extend the prefix path instead of replacing its last segment.
/// The query component is replaced by `search_params`, or cleared.
pub fn build_url(endpoint: &str, prefix_url: Option<&str>, search_params: Option<&str>) -> Result<Url> {
    let mut url = match prefix_url {
        Some(prefix) => {
            let base = if prefix.ends_with('/') {
                prefix.to_string()
            } else {
                format!("{}/", prefix)
            };

            Url::parse(&base)
                .and_then(|base| base.join(endpoint))
                .map_err(|source| crate::Error::InvalidUrl {
                    url: format!("{}{}", base, endpoint),
                    source,
                })?
        }
        None => Url::parse(endpoint).map_err(|source| crate::Error::InvalidUrl {
            url: endpoint.to_string(),
            source,
        })?,
    };

    url.set_query(search_params.filter(|query| !query.is_empty()));
    Ok(url)
}

/// A fully built request, ready to be handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
    pub mode: RequestMode,
    pub accept_invalid_certs: bool,
}

impl PreparedRequest {
    /// Build the request for `endpoint` from resolved options
    pub fn build(endpoint: &str, options: &RequestOptions) -> Result<Self> {
        let url = build_url(
            endpoint,
            options.prefix_url.as_deref(),
            options.search_params.as_deref(),
        )?;

        Ok(Self {
            method: options.method.clone(),
            url,
            headers: options.headers.clone(),
            body: options.body.clone(),
            mode: request_mode(endpoint),
            accept_invalid_certs: options.accept_invalid_certs,
        })
    }
}
