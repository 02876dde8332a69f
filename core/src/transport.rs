//! Collaborators the service depends on: something that executes an
//! `HttpRequest`, and something that says whether the network is up.
//!
//! Both are traits so tests can substitute counting or canned
//! implementations.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::{BuildError, TransportError};
use crate::http::{HttpRequest, HttpResponse};

/// Executes a built request. Non-2xx statuses are data, not errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Reports whether a request has any chance of reaching the server.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError(e.to_string()))?;

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(url = %request.url, error = %e, "transport failure");
            TransportError(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?
            .to_vec();

        tracing::debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Probe that never reports an outage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

#[async_trait]
impl Connectivity for AlwaysOnline {
    async fn is_reachable(&self) -> bool {
        true
    }
}

/// Probe that opens a TCP connection to the API host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Probe the host and port (or scheme default port) of `base_url`.
    pub fn for_base_url(base_url: &str, timeout: Duration) -> Result<Self, BuildError> {
        let url = url::Url::parse(base_url)
            .map_err(|e| BuildError::InvalidUrl(format!("{base_url} ({e})")))?;
        let host = url
            .host_str()
            .ok_or_else(|| BuildError::InvalidUrl(base_url.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| BuildError::InvalidUrl(base_url.to_string()))?;
        Ok(Self::new(format!("{host}:{port}"), timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_reachable(&self) -> bool {
        let reachable = matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await,
            Ok(Ok(_))
        );
        if !reachable {
            tracing::debug!(addr = %self.addr, "connectivity probe failed");
        }
        reachable
    }
}
