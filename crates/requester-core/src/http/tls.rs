//! TLS verification policy for outgoing requests
//!
//! A resource may ask for certificate verification to be skipped. Whether
//! that request can be honoured depends on the host the transport runs in,
//! which is described by [`TransportCapabilities`] and fixed at construction
//! time.

use serde::{Deserialize, Serialize};
use url::Url;

/// Facts about the host environment the transport runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportCapabilities {
    /// Whether per-request transport agents (custom TLS settings) can be used.
    ///
    /// Browser-like hosts delegate certificate handling to the host and
    /// report `false`.
    pub custom_agents: bool,
}

impl Default for TransportCapabilities {
    fn default() -> Self {
        Self::native()
    }
}

impl TransportCapabilities {
    /// Capabilities of a native process with full control over its TLS stack
    pub fn native() -> Self {
        Self { custom_agents: true }
    }

    /// Capabilities of a sandboxed, browser-like host
    pub fn sandboxed() -> Self {
        Self { custom_agents: false }
    }
}

/// Decide whether certificate verification is disabled for one call.
///
/// The bypass is attached only when the target is `https`, the resource
/// explicitly set `reject_unauthorized` to `false` and the host supports
/// custom agents. In every other case the answer is `false`; a sandboxed
/// host silently ignores the setting.
pub fn should_bypass_verification(
    target: &str,
    reject_unauthorized: Option<bool>,
    capabilities: TransportCapabilities,
) -> bool {
    if reject_unauthorized != Some(false) || !capabilities.custom_agents {
        return false;
    }

    is_secure_scheme(target)
}

fn is_secure_scheme(target: &str) -> bool {
    match Url::parse(target) {
        Ok(url) => url.scheme() == "https",
        Err(_) => target
            .get(..8)
            .map(|prefix| prefix.eq_ignore_ascii_case("https://"))
            .unwrap_or(false),
    }
}
