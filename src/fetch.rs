//! Bounded fetch queue and the HTTP transport behind it
//!
//! Every outbound request of the pipeline (manifests, assets, metadata) goes
//! through one [`FetchQueue`]. The queue admits at most N requests to the
//! transport at a time; further callers wait in FIFO order and are admitted as
//! soon as an in-flight request settles, whether it succeeded or failed.
//!
//! The queue never retries. A failure is returned only to the caller that
//! enqueued the failing URL.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// A settled HTTP response with its full body
#[derive(Clone, Debug)]
pub struct RawResponse {
    url: String,
    status: u16,
    body: Vec<u8>,
}

impl RawResponse {
    /// Create a response (used by transports)
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// URL this response answers
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`Error::Transport`]
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Transport {
                reason: format!("Returned status code: {}", self.status),
                status: Some(self.status),
                url: self.url,
            })
        }
    }

    /// Raw body bytes
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Take ownership of the body
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(|e| Error::Read {
            url: self.url.clone(),
            reason: format!("Cannot read body as text: {}", e),
        })
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Read {
            url: self.url.clone(),
            reason: format!("Cannot parse body as JSON: {}", e),
        })
    }
}

/// Transport used by the fetch queue
///
/// Implementations perform one GET and return the settled response, including
/// non-2xx answers. Network-level failures are reported as [`Error::Transport`]
/// with no status.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and read the whole body
    async fn get(&self, url: &str) -> Result<RawResponse>;
}

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from fetch settings (user agent, optional timeout)
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, e))?;

        Ok(RawResponse::new(url, status, body.to_vec()))
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> Error {
    let reason = if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    Error::Transport {
        url: url.to_string(),
        reason,
        status: e.status().map(|s| s.as_u16()),
    }
}

/// Bounded FIFO queue in front of a [`Transport`]
///
/// Cloning is cheap; clones share the same admission limit.
#[derive(Clone)]
pub struct FetchQueue {
    transport: Arc<dyn Transport>,
    /// Fair semaphore: waiters are admitted in the order they called `enqueue`
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl FetchQueue {
    /// Default number of requests admitted at once
    pub const DEFAULT_CAPACITY: usize = 30;

    /// Create a queue admitting at most `max_concurrent` requests at once
    pub fn new(transport: Arc<dyn Transport>, max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            transport,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Create a reqwest-backed queue from fetch settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.max_concurrent_requests))
    }

    /// Maximum requests admitted at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests currently admitted to the transport
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Fetch `url` once a slot is free
    ///
    /// The slot is held until the transport call settles (body included) and is
    /// released on both success and failure. Non-2xx responses are returned as-is;
    /// callers decide whether a status is an error.
    pub async fn enqueue(&self, url: &str) -> Result<RawResponse> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Other("fetch queue closed".to_string()))?;

        debug!(url, in_flight = self.in_flight(), "request admitted");

        match self.transport.get(url).await {
            Ok(response) => {
                debug!(url, status = response.status(), "request settled");
                Ok(response)
            }
            Err(e) => {
                warn!(url, error = %e, "request failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for FetchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchQueue")
            .field("capacity", &self.capacity)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
