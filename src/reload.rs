//! Live-reload protocol shared by the markup task and the websocket server.

use serde::{Deserialize, Serialize};

/// What connected browsers should do after a task has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Reload {
    /// Nothing to refresh.
    #[default]
    None,
    /// Reload the whole page.
    Full,
    /// Swap the listed stylesheets in place.
    Stylesheets(Vec<String>),
}

impl Reload {
    pub fn messages(&self) -> Vec<ReloadMessage> {
        match self {
            Reload::None => vec![],
            Reload::Full => vec![ReloadMessage::Reload],
            Reload::Stylesheets(paths) => paths
                .iter()
                .map(|path| ReloadMessage::Css { path: path.clone() })
                .collect(),
        }
    }
}

/// Frame sent to the browser over the websocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    Reload,
    Css { path: String },
}

/// Client snippet that connects to the live-reload websocket.
pub fn client_script(port: u16) -> String {
    format!(
        r#"<script>
(function () {{
  const socket = new WebSocket("ws://" + location.hostname + ":{port}/");
  socket.addEventListener("message", function (event) {{
    const msg = JSON.parse(event.data);
    if (msg.type === "css") {{
      document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {{
        const url = new URL(link.href);
        if (url.pathname === msg.path) {{
          url.searchParams.set("v", Date.now());
          link.href = url.toString();
        }}
      }});
    }} else {{
      location.reload();
    }}
  }});
}})();
</script>"#
    )
}

/// Insert the client snippet right before the closing body tag, or at the end
/// of the document if it has none.
pub fn inject(html: &str, port: u16) -> String {
    let script = client_script(port);

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + script.len() + 1);
            out.push_str(&html[..at]);
            out.push_str(&script);
            out.push('\n');
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}\n{script}\n"),
    }
}
