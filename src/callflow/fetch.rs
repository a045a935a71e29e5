//! Retrieval of call-flow documents.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::{
    channel::CallParties,
    constants::DEFAULT_TIMEOUT_MS,
    error::{GatewayError, GatewayResult},
};

/// Query parameters sent with a document request, in order.
pub type QueryParams = Vec<(String, String)>;

/// Source of call-flow documents.
///
/// [`HttpFetcher`] is the production implementation; tests substitute an
/// in-memory one.
pub trait DocumentFetcher: Send + Sync {
    /// Retrieve the document at `url` with `params` as its query string.
    fn fetch(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = GatewayResult<String>> + Send;
}

/// Parameters every request carries so the document author can personalize
/// the flow.
pub fn base_params(parties: &CallParties) -> QueryParams {
    vec![
        ("uuid".to_string(), parties.uuid.clone()),
        ("from".to_string(), parties.from.clone()),
        ("to".to_string(), parties.to.clone()),
    ]
}

/// Overlay `extra` on `base`. A key present in both keeps its base position
/// but takes the extra value; new keys are appended in order.
pub fn merge_params(base: &[(String, String)], extra: &[(String, String)]) -> QueryParams {
    let mut merged: QueryParams = base.to_vec();
    for (key, value) in extra {
        match merged
            .iter_mut()
            .find(|(k, _)| k == key)
        {
            Some(slot) => slot.1 = value.clone(),
            None => merged.push((key.clone(), value.clone())),
        }
    }
    merged
}

/// Fetches documents with HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Client with a bounded connect phase; the transfer itself is not timed.
    pub fn new() -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("jeego/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()?;
        Ok(Self { client })
    }
}

impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> GatewayResult<String> {
        debug!("[FETCH] GET {} ({} params)", url, params.len());
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await?;
        debug!("[FETCH] {} returned {} bytes", url, body.len());
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    /// Fetcher for flows that must never reach the document server.
    pub(crate) struct NoFetch;

    impl DocumentFetcher for NoFetch {
        async fn fetch(&self, url: &str, _params: &[(String, String)]) -> GatewayResult<String> {
            panic!("unexpected fetch of {}", url)
        }
    }
}
