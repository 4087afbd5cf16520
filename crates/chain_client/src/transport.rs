//! JSON-RPC over HTTP, shared by the wallet agent and the read node.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::protocol::{RpcErrorObject, RpcRequest, RpcResponse};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rpc endpoint {url} unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("rpc http failure: {0}")]
    Http(#[source] reqwest::Error),
    #[error("{0}")]
    Rpc(RpcErrorObject),
    #[error("malformed response to {method}: {reason}")]
    Malformed { method: String, reason: String },
}

impl TransportError {
    pub fn rpc_error(&self) -> Option<&RpcErrorObject> {
        match self {
            TransportError::Rpc(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }
}

pub struct RpcTransport {
    http: Client,
    url: Url,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(url: Url) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(http: Client, url: Url) -> Self {
        Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, TransportError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, url = %self.url, "rpc request");

        let response = self
            .http
            .post(self.url.clone())
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|source| {
                if source.is_connect() || source.is_timeout() {
                    TransportError::Unreachable {
                        url: self.url.to_string(),
                        source,
                    }
                } else {
                    TransportError::Http(source)
                }
            })?
            .error_for_status()
            .map_err(TransportError::Http)?;

        let body: RpcResponse =
            response
                .json()
                .await
                .map_err(|err| TransportError::Malformed {
                    method: method.to_string(),
                    reason: err.to_string(),
                })?;

        if let Some(error) = body.error {
            debug!(method, id, code = error.code, "rpc error response");
            return Err(TransportError::Rpc(error));
        }

        serde_json::from_value(body.result).map_err(|err| TransportError::Malformed {
            method: method.to_string(),
            reason: err.to_string(),
        })
    }
}
