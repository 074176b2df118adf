//! Authentication headers for API resources
//!
//! Supports the token schemes a REST resource can be configured with:
//! - Private/personal access tokens (`private-token` header)
//! - OAuth bearer tokens (`authorization` header)
//! - CI job tokens (`job-token` header)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use crate::Result;

/// Credential attached to every request of a resource
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "token", rename_all = "snake_case")]
pub enum AuthToken {
    /// Personal or project access token
    Private(String),
    /// OAuth2 access token, sent as a bearer token
    #[serde(rename = "oauth")]
    OAuth(String),
    /// Token issued to a CI job
    Job(String),
}

impl AuthToken {
    /// Header name and value carrying this credential
    pub fn header(&self) -> (&'static str, String) {
        match self {
            AuthToken::Private(token) => ("private-token", token.clone()),
            AuthToken::OAuth(token) => ("authorization", format!("Bearer {}", token)),
            AuthToken::Job(token) => ("job-token", token.clone()),
        }
    }

    /// Insert the credential header into a header map
    pub fn apply_auth(&self, headers: &mut BTreeMap<String, String>) {
        let (name, value) = self.header();
        headers.insert(name.to_string(), value);
    }

    /// Validate that the credential is usable
    pub fn validate(&self) -> Result<()> {
        let token = match self {
            AuthToken::Private(token) | AuthToken::OAuth(token) | AuthToken::Job(token) => token,
        };

        if token.trim().is_empty() {
            return Err(crate::Error::Configuration {
                message: format!("{} token is empty", self.kind()),
            });
        }

        Ok(())
    }

    fn kind(&self) -> &'static str {
        match self {
            AuthToken::Private(_) => "Private",
            AuthToken::OAuth(_) => "OAuth",
            AuthToken::Job(_) => "Job",
        }
    }
}

// Tokens never end up in logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken::{}(***)", self.kind())
    }
}
