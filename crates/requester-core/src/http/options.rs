//! Option resolution for outgoing requests
//!
//! Merges resource-level defaults ([`ResourceOptions`]) with per-call
//! overrides ([`RequestOverrides`]) into the final [`RequestOptions`] the
//! executor consumes. Resolution is total: it never fails and never mutates
//! its inputs.

use std::collections::BTreeMap;
use bytes::Bytes;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;
use crate::http::auth::AuthToken;
use crate::http::tls::{should_bypass_verification, TransportCapabilities};

/// Defaults shared by every request made on behalf of one API resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceOptions {
    /// Base URL every endpoint of the resource is resolved against
    pub url: String,
    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Credential sent with every request
    #[serde(default)]
    pub auth: Option<AuthToken>,
    /// Identity to impersonate, sent as the `sudo` header
    #[serde(default)]
    pub sudo: Option<String>,
    /// `Some(false)` asks for TLS certificate verification to be skipped
    #[serde(default)]
    pub reject_unauthorized: Option<bool>,
}

impl ResourceOptions {
    /// Create resource options for a base URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a default header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the credential
    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Impersonate another user on every request
    pub fn with_sudo(mut self, sudo: impl Into<String>) -> Self {
        self.sudo = Some(sudo.into());
        self
    }

    /// Set whether invalid TLS certificates are rejected
    pub fn with_reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = Some(reject);
        self
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON; implies `content-type: application/json`
    Json(Value),
    /// Sent verbatim
    Text(String),
    /// Sent verbatim
    Bytes(Bytes),
}

/// Query parameters of a request
#[derive(Debug, Clone, PartialEq)]
pub enum SearchParams {
    /// An already encoded query string, without the leading `?`
    Encoded(String),
    /// Key/value pairs to be form-urlencoded in order
    Pairs(Vec<(String, String)>),
}

impl SearchParams {
    /// Encode into a query string; `None` when there is nothing to send
    pub fn encode(&self) -> Option<String> {
        let encoded = match self {
            SearchParams::Encoded(query) => query.trim_start_matches('?').to_string(),
            SearchParams::Pairs(pairs) => form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish(),
        };

        if encoded.is_empty() {
            None
        } else {
            Some(encoded)
        }
    }
}

/// Per-call overrides of the resource defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverrides {
    pub method: Option<Method>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
    pub search_params: Option<SearchParams>,
    pub prefix_url: Option<String>,
    pub sudo: Option<String>,
    pub as_stream: bool,
}

impl RequestOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    /// Set query parameters from key/value pairs
    pub fn query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.search_params = Some(SearchParams::Pairs(pairs));
        self
    }

    /// Set an already encoded query string
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search_params = Some(SearchParams::Encoded(query.into()));
        self
    }

    pub fn prefix_url(mut self, prefix_url: impl Into<String>) -> Self {
        self.prefix_url = Some(prefix_url.into());
        self
    }

    pub fn sudo(mut self, sudo: impl Into<String>) -> Self {
        self.sudo = Some(sudo.into());
        self
    }

    /// Return the raw byte stream instead of a decoded body
    pub fn stream(mut self) -> Self {
        self.as_stream = true;
        self
    }
}

/// Final configuration of one request, as consumed by the executor
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
    pub prefix_url: Option<String>,
    /// Encoded query string, without the leading `?`
    pub search_params: Option<String>,
    pub as_stream: bool,
    /// Skip TLS certificate verification for this call only
    pub accept_invalid_certs: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: BTreeMap::new(),
            body: None,
            prefix_url: None,
            search_params: None,
            as_stream: false,
            accept_invalid_certs: false,
        }
    }
}

/// Resolves resource defaults and call overrides into [`RequestOptions`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionResolver {
    capabilities: TransportCapabilities,
}

impl OptionResolver {
    /// Create a resolver for a host with the given capabilities
    pub fn new(capabilities: TransportCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> TransportCapabilities {
        self.capabilities
    }

    /// Merge resource defaults with call overrides; overrides win
    pub fn resolve(&self, resource: &ResourceOptions, overrides: RequestOverrides) -> RequestOptions {
        let RequestOverrides {
            method,
            headers: override_headers,
            body,
            search_params,
            prefix_url,
            sudo,
            as_stream,
        } = overrides;

        let mut headers = BTreeMap::new();
        merge_headers(&mut headers, &resource.headers);

        if let Some(auth) = &resource.auth {
            auth.apply_auth(&mut headers);
        }

        if let Some(sudo) = sudo.as_ref().or(resource.sudo.as_ref()) {
            headers.insert("sudo".to_string(), sudo.clone());
        }

        merge_headers(&mut headers, &override_headers);

        if matches!(body, Some(RequestBody::Json(_))) && !headers.contains_key("content-type") {
            headers.insert("content-type".to_string(), "application/json".to_string());
        }

        let prefix_url = prefix_url
            .or_else(|| Some(resource.url.clone()))
            .filter(|url| !url.is_empty());

        let accept_invalid_certs = prefix_url
            .as_deref()
            .map(|target| {
                should_bypass_verification(target, resource.reject_unauthorized, self.capabilities)
            })
            .unwrap_or(false);

        RequestOptions {
            method: method.unwrap_or(Method::GET),
            headers,
            body,
            prefix_url,
            search_params: search_params.as_ref().and_then(SearchParams::encode),
            as_stream,
            accept_invalid_certs,
        }
    }
}

fn merge_headers(target: &mut BTreeMap<String, String>, source: &BTreeMap<String, String>) {
    for (name, value) in source {
        target.insert(name.to_ascii_lowercase(), value.clone());
    }
}
