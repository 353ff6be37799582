//! Development and preview servers for the Capira front end.
//!
//! The dev server serves the source tree with live reload, forwards API
//! requests to the backend, and re-runs style tasks when sources change. The
//! preview server serves the production build with a history fallback.

pub mod preview;
pub mod proxy;
pub mod reload;
pub mod server;
pub mod watcher;

pub use preview::{preview_router, PreviewConfig, PreviewServer};
pub use proxy::{ApiProxy, ProxyError};
pub use reload::{inject_reload_script, ReloadHub, ReloadMessage};
pub use server::{router, AppState, DevServer, DevServerConfig, ServerError, DEFAULT_PROXY_TARGET};
pub use watcher::{classify, FileWatcher, WatchAction, WatchEvent};
