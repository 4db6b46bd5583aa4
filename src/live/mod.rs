//! Development services: the live-reload websocket, the HTTP server and the
//! file watcher.
//!
//! The watcher and the websocket hub come with the `live` feature, the HTTP
//! server additionally needs `server`.

mod hub;
#[cfg(feature = "server")]
mod http;
mod watch;

pub use hub::LiveReload;
#[cfg(feature = "server")]
pub use http::Server;
pub use watch::{Routes, watch};
