//! Preview server for the production build.

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::Response,
    Router,
};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::server::{listen_address, serve, ServerError};

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Built output served at `/`
    pub dist_dir: PathBuf,

    pub port: u16,

    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from("dist"),
            port: 3001,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Serves the distribution tree with an HTML5 history fallback.
pub struct PreviewServer {
    config: PreviewConfig,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let addr = listen_address(&self.config.host, self.config.port)?;
        serve(preview_router(&self.config.dist_dir), addr, self.config.open).await
    }
}

/// Build the preview router for `dist_dir`.
pub fn preview_router(dist_dir: &Path) -> Router {
    Router::new()
        .fallback(history_fallback)
        .with_state(dist_dir.to_path_buf())
}

/// Serve files; unknown page routes get `index.html` so client-side routing
/// can take over.
async fn history_fallback(State(dist_dir): State<PathBuf>, request: Request) -> Response {
    let wants_page = is_page_navigation(&request);
    let index_request = wants_page.then(|| {
        let mut index = Request::new(Body::empty());
        *index.headers_mut() = request.headers().clone();
        index
    });

    let response = match ServeDir::new(&dist_dir).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    match index_request {
        Some(index_request) if response.status() == StatusCode::NOT_FOUND => {
            match ServeFile::new(dist_dir.join("index.html")).oneshot(index_request).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            }
        }
        _ => response,
    }
}

/// A GET or HEAD for an HTML page whose last path segment has no extension.
fn is_page_navigation(request: &Request) -> bool {
    let method_ok = request.method() == Method::GET || request.method() == Method::HEAD;
    let accepts_html = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html") || accept.contains("*/*"));
    let last_segment = request.uri().path().rsplit('/').next().unwrap_or("");

    method_ok && accepts_html && !last_segment.contains('.')
}
