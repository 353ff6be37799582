//! Reverse proxy for backend API requests.

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap};
use axum::http::request::Parts;
use axum::response::Response;

/// Errors while forwarding a request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Failed to create proxy client: {0}")]
    Client(String),

    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid backend response: {0}")]
    Response(String),
}

/// Forwards requests under configured path prefixes to a backend.
///
/// The backend URL is the target joined with the original path and query,
/// so `/api/users?id=1` against `http://host/base` goes to
/// `http://host/base/api/users?id=1`.
#[derive(Debug, Clone)]
pub struct ApiProxy {
    target: String,
    prefixes: Vec<String>,
    client: reqwest::Client,
}

impl ApiProxy {
    pub fn new(target: &str, prefixes: Vec<String>) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::Client(e.to_string()))?;

        Ok(Self {
            target: target.trim_end_matches('/').to_string(),
            prefixes,
            client,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether a request path belongs to the backend.
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Backend URL for a request.
    pub fn upstream_url(&self, parts: &Parts) -> String {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        format!("{}{}", self.target, path_and_query)
    }

    /// Send the request to the backend and relay its response.
    ///
    /// Method, path, query, end-to-end headers and body are preserved. The
    /// `Host` header is set for the backend.
    pub async fn forward(&self, parts: &Parts, body: Bytes) -> Result<Response, ProxyError> {
        let url = self.upstream_url(parts);
        tracing::debug!("Proxying {} {} -> {}", parts.method, parts.uri, url);

        let mut headers = end_to_end(&parts.headers);
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method.clone(), &url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let headers = end_to_end(upstream.headers());
        let bytes = upstream.bytes().await?;

        let mut builder = Response::builder().status(status);
        if let Some(response_headers) = builder.headers_mut() {
            response_headers.extend(headers);
        }
        builder
            .body(Body::from(bytes))
            .map_err(|e| ProxyError::Response(e.to_string()))
    }
}

/// Copy of `headers` without the ones that describe a single connection.
fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let hop_by_hop = [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ];

    let mut filtered = headers.clone();
    for name in hop_by_hop {
        filtered.remove(name);
    }
    filtered.remove("keep-alive");
    filtered
}
