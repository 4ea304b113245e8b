//! [`PeerTransport`] over HTTP.
//!
//! Node ids are base URLs, so every call is the peer's address plus one of
//! the internal endpoints. Keys are percent-encoded as a single path
//! segment.

use crate::error::HttpError;
use crate::protocol::{
    ExchangeRequest, ExchangeResponse, ENDPOINT_EXCHANGE, ENDPOINT_GET_INTERNAL, ENDPOINT_REPLICATE,
    ENDPOINT_ROUTE, VERSION_HEADER,
};
use async_trait::async_trait;
use corelib::NodeId;
use replication::{PeerTransport, TransportError, Versioned};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;

/// Calls peers with one shared connection pool and a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, timeout))
    }

    /// Uses a preconfigured client, e.g. one without connection reuse.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(peer: &NodeId, endpoint: &str, key: Option<&str>) -> Result<Url, TransportError> {
        let invalid = |reason: String| TransportError::Unreachable {
            peer: peer.clone(),
            reason,
        };
        let mut url = Url::parse(peer.as_str())
            .map_err(|err| invalid(format!("invalid peer address: {err}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| invalid("peer address cannot be a base url".to_string()))?;
            segments
                .pop_if_empty()
                .extend(endpoint.split('/').filter(|s| !s.is_empty()));
            if let Some(key) = key {
                segments.push(key);
            }
        }
        Ok(url)
    }

    async fn dispatch(&self, peer: &NodeId, request: RequestBuilder) -> Result<Response, TransportError> {
        request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| TransportError::Unreachable {
                peer: peer.clone(),
                reason: err.to_string(),
            })
    }

    fn expect_success(peer: &NodeId, response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(TransportError::Status {
                peer: peer.clone(),
                status: status.as_u16(),
            })
        }
    }

    async fn put_value(
        &self,
        peer: &NodeId,
        endpoint: &str,
        key: &str,
        entry: &Versioned,
    ) -> Result<(), TransportError> {
        let url = Self::url(peer, endpoint, Some(key))?;
        let request = self
            .client
            .put(url)
            .header(VERSION_HEADER, entry.version.to_string())
            .body(entry.value.clone());
        let response = self.dispatch(peer, request).await?;
        Self::expect_success(peer, response)?;
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn replicate(
        &self,
        peer: &NodeId,
        key: &str,
        entry: &Versioned,
    ) -> Result<(), TransportError> {
        self.put_value(peer, ENDPOINT_REPLICATE, key, entry).await
    }

    async fn forward_write(
        &self,
        peer: &NodeId,
        key: &str,
        entry: &Versioned,
    ) -> Result<(), TransportError> {
        self.put_value(peer, ENDPOINT_ROUTE, key, entry).await
    }

    async fn fetch(&self, peer: &NodeId, key: &str) -> Result<Option<String>, TransportError> {
        let url = Self::url(peer, ENDPOINT_GET_INTERNAL, Some(key))?;
        let response = self.dispatch(peer, self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = Self::expect_success(peer, response)?
            .text()
            .await
            .map_err(|err| TransportError::Decode {
                peer: peer.clone(),
                reason: err.to_string(),
            })?;
        Ok(Some(body))
    }

    async fn exchange(
        &self,
        peer: &NodeId,
        from: &NodeId,
        known: &[NodeId],
    ) -> Result<Vec<NodeId>, TransportError> {
        let url = Self::url(peer, ENDPOINT_EXCHANGE, None)?;
        let request = ExchangeRequest {
            from: from.clone(),
            peers: known.to_vec(),
        };
        let response = self
            .dispatch(peer, self.client.post(url).json(&request))
            .await?;
        let answer: ExchangeResponse = Self::expect_success(peer, response)?
            .json()
            .await
            .map_err(|err| TransportError::Decode {
                peer: peer.clone(),
                reason: err.to_string(),
            })?;
        Ok(answer.peers)
    }
}
