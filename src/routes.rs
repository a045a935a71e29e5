//! Destination → call-flow document routing.

use serde::Deserialize;

/// One configured route: calls to `did` are driven by the document at `url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteRule {
    #[serde(rename = "@DID")]
    pub did: String,
    #[serde(rename = "@URL")]
    pub url: String,
}

impl RouteRule {
    pub fn new(did: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            url: url.into(),
        }
    }
}

/// Immutable set of route rules, the `<Routes>` element of the config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouteTable {
    #[serde(rename = "Rule", default)]
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Document URL for `did`. Exact string equality, first match wins; no
    /// prefix or wildcard matching.
    pub fn resolve(&self, did: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.did == did)
            .map(|rule| rule.url.as_str())
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules
            .is_empty()
    }
}
