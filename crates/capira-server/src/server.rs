//! Development server implementation.

use std::fmt::Write as _;
use std::fs;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use capira_lint::{lint_files, JsLinter};
use capira_pipeline::Pipeline;

use crate::proxy::{ApiProxy, ProxyError};
use crate::reload::{inject_reload_script, reload_client_script, ReloadHub, ReloadMessage};
use crate::watcher::{classify, dedupe, FileWatcher, WatchAction};

/// Backend the API proxy forwards to unless configured otherwise.
pub const DEFAULT_PROXY_TARGET: &str = "http://capira.de/build/socratic";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory served at `/`
    pub src_dir: PathBuf,

    /// Extra mounts: URL prefix → directory
    pub routes: Vec<(String, PathBuf)>,

    /// Backend for proxied API requests
    pub proxy_target: String,

    /// Path prefixes sent to the backend
    pub proxy_prefixes: Vec<String>,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            routes: vec![
                ("/bower_components".to_string(), PathBuf::from("bower_components")),
                ("/showcase".to_string(), PathBuf::from("showcase")),
                ("/static".to_string(), PathBuf::from("static")),
            ],
            proxy_target: DEFAULT_PROXY_TARGET.to_string(),
            proxy_prefixes: vec!["/api/".to_string()],
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

/// Shared server state.
pub struct AppState {
    src_dir: PathBuf,
    proxy: ApiProxy,
    reload: ReloadHub,
}

impl AppState {
    pub fn new(src_dir: PathBuf, proxy: ApiProxy, reload: ReloadHub) -> Self {
        Self {
            src_dir,
            proxy,
            reload,
        }
    }
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    pipeline: Pipeline,
}

impl DevServer {
    /// Create a dev server; `pipeline` re-runs style tasks on change.
    pub fn new(config: DevServerConfig, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    /// Start the development server.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = listen_address(&self.config.host, self.config.port)?;
        let reload = ReloadHub::new();
        let proxy = ApiProxy::new(&self.config.proxy_target, self.config.proxy_prefixes.clone())?;

        let state = Arc::new(AppState::new(self.config.src_dir.clone(), proxy, reload.clone()));

        let (watcher, mut rx) = FileWatcher::new(&[self.config.src_dir.clone()])
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let src_dir = self.config.src_dir.clone();
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                // Let a burst of saves settle, then handle it as one
                tokio::time::sleep(Duration::from_millis(100)).await;
                let mut events = vec![event];
                while let Ok(event) = rx.try_recv() {
                    events.push(event);
                }

                let actions = dedupe(events.iter().filter_map(|e| classify(&src_dir, e)));
                for action in actions {
                    handle_action(&pipeline, &reload, action).await;
                }
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(state, &self.config.routes);
        tracing::info!(
            "Proxying {} to {}",
            self.config.proxy_prefixes.join(", "),
            self.config.proxy_target
        );
        serve(app, addr, self.config.open).await
    }
}

/// Build the dev server's router.
pub fn router(state: Arc<AppState>, routes: &[(String, PathBuf)]) -> Router {
    let mut app = Router::new()
        .route("/__reload", get(ws_handler))
        .route("/__reload.js", get(reload_script_handler));

    for (prefix, dir) in routes {
        app = app.nest_service(prefix, ServeDir::new(dir));
    }

    app.fallback(fallback_handler).with_state(state)
}

pub(crate) fn listen_address(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    format!("{}:{}", host, port)
        .parse()
        .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", host, port)))
}

/// Bind, optionally open a browser, and serve until shutdown.
pub(crate) async fn serve(app: Router, addr: SocketAddr, open: bool) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

    tracing::info!("Serving at http://{}", addr);

    if open {
        let url = format!("http://{}", addr);
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::BindError(addr, e.to_string()))
}

/// Handle one watch-triggered action. Failures are logged, never fatal.
async fn handle_action(pipeline: &Pipeline, reload: &ReloadHub, action: WatchAction) {
    match action {
        WatchAction::Reload => reload.send(ReloadMessage::Reload),

        WatchAction::Rebuild(task) => match pipeline.run_task(task).await {
            Ok(_) => reload.send(ReloadMessage::Reload),
            Err(e) => tracing::error!("{}", e),
        },

        WatchAction::Lint(path) => {
            let result =
                tokio::task::spawn_blocking(move || lint_files(&JsLinter::new(), &[path])).await;
            match result {
                Ok(Ok(report)) => {
                    for diagnostic in &report.diagnostics {
                        tracing::warn!("{}", diagnostic);
                    }
                }
                Ok(Err(e)) => tracing::warn!("{}", e),
                Err(e) => tracing::error!("Lint worker failed: {}", e),
            }
        }
    }
}

/// Proxy API requests, serve everything else from the source tree.
async fn fallback_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    if !state.proxy.matches(request.uri().path()) {
        return serve_source(&state, request).await;
    }

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.proxy.forward(&parts, body.clone()).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Proxy failed for {}: {}; serving from disk", parts.uri, e);
            serve_source(&state, Request::from_parts(parts, Body::from(body))).await
        }
    }
}

/// Serve a file from the source tree, injecting the reload script into HTML
/// and listing directories that have no index page.
async fn serve_source(state: &AppState, request: Request) -> Response {
    let path = request.uri().path().to_string();

    let response = match ServeDir::new(&state.src_dir).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        if let Some(listing) = directory_listing(&state.src_dir, &path) {
            return Html(listing).into_response();
        }
        return response;
    }

    if is_html(&response) {
        return with_reload_script(response).await;
    }
    response
}

fn is_html(response: &Response) -> bool {
    response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"))
}

async fn with_reload_script(response: Response) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let body = match String::from_utf8(bytes.to_vec()) {
        Ok(html) => Body::from(inject_reload_script(&html)),
        Err(_) => Body::from(bytes),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

/// HTML index of a directory under `root`, if `url_path` names one.
fn directory_listing(root: &Path, url_path: &str) -> Option<String> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let dir = root.join(relative);
    if !dir.is_dir() {
        return None;
    }

    let mut names: Vec<String> = fs::read_dir(&dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if e.path().is_dir() {
                format!("{}/", name)
            } else {
                name
            }
        })
        .collect();
    names.sort();

    let base = if url_path.ends_with('/') {
        url_path.to_string()
    } else {
        format!("{}/", url_path)
    };

    let mut html = format!("<!DOCTYPE html>\n<html>\n<head><title>Index of {0}</title></head>\n<body>\n<h1>Index of {0}</h1>\n<ul>\n", base);
    for name in names {
        let _ = writeln!(html, "<li><a href=\"{}{}\">{}</a></li>", base, name, name);
    }
    html.push_str("</ul>\n</body>\n</html>\n");

    Some(inject_reload_script(&html))
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.reload.subscribe();
    ws.on_upgrade(move |socket| handle_ws(socket, rx))
}

/// Forward reload messages to one browser.
async fn handle_ws(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<ReloadMessage>,
) {
    let mut messages = vec![ReloadMessage::Connected];

    loop {
        for msg in messages.drain(..) {
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if socket.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }

        match rx.recv().await {
            Ok(msg) => messages.push(msg),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                messages.push(ReloadMessage::Reload)
            }
            Err(_) => return,
        }
    }
}

async fn reload_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        reload_client_script(),
    )
}
