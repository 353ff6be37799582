//! WebSocket-based live reload.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Element the reload script replaces when a page provides one.
pub const SNIPPET_MARKER: &str = r#"<span id="browser-sync-binding"></span>"#;

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload,

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert the reload script tag into an HTML page.
///
/// The tag replaces [`SNIPPET_MARKER`] when present, otherwise it goes right
/// before `</body>`. Pages with neither are returned unchanged.
pub fn inject_reload_script(html: &str) -> String {
    static BODY_END_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("Invalid body regex"));

    let tag = r#"<script async src="/__reload.js"></script>"#;

    if html.contains(SNIPPET_MARKER) {
        return html.replacen(SNIPPET_MARKER, tag, 1);
    }
    match BODY_END_RE.find_iter(html).last() {
        Some(body_end) => format!(
            "{}{}{}",
            &html[..body_end.start()],
            tag,
            &html[body_end.start()..]
        ),
        None => html.to_string(),
    }
}

/// The client-side reload script served at `/__reload.js`.
pub fn reload_client_script() -> &'static str {
    r#"(function() {
  'use strict';

  var protocol = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var attempts = 0;

  function connect() {
    var ws = new WebSocket(protocol + location.host + '/__reload');

    ws.onopen = function() {
      attempts = 0;
    };

    ws.onmessage = function(event) {
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {
        location.reload();
      } else if (msg.type === 'connected') {
        console.log('[CAPIRA] Live reload connected');
      }
    };

    ws.onclose = function() {
      if (attempts < 10) {
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }
    };
  }

  connect();
})();
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Reload);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn serializes_messages() {
        let json = serde_json::to_string(&ReloadMessage::Reload).unwrap();

        assert_eq!(json, r#"{"type":"reload"}"#);
    }

    #[test]
    fn injects_at_marker() {
        let html = format!("<body><header></header>{}<main></main></body>", SNIPPET_MARKER);

        let injected = inject_reload_script(&html);

        assert_eq!(
            injected,
            r#"<body><header></header><script async src="/__reload.js"></script><main></main></body>"#
        );
    }

    #[test]
    fn injects_before_body_end() {
        assert_eq!(
            inject_reload_script("<body><p>x</p></BODY>"),
            r#"<body><p>x</p><script async src="/__reload.js"></script></BODY>"#
        );
        assert_eq!(inject_reload_script("<dom-module></dom-module>"), "<dom-module></dom-module>");
    }
}
