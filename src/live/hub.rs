use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tungstenite::WebSocket;

use crate::reload::{Reload, ReloadMessage};

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Most recent connections kept open, older tabs are dropped.
const MAX_CLIENTS: usize = 10;

/// Websocket endpoint the injected client script connects to.
pub struct LiveReload {
    port: u16,
    clients: Clients,
    tx: Sender<ReloadMessage>,
}

impl LiveReload {
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let port = listener.local_addr()?.port();

        let clients = Arc::new(Mutex::new(vec![]));
        let _thread_i = new_thread_ws_incoming(listener, clients.clone());
        let (tx, _thread_o) = new_thread_ws_reload(clients.clone());

        tracing::info!("live-reload listening on ws://127.0.0.1:{port}/");

        Ok(Self { port, clients, tx })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of connected browser tabs.
    pub fn clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Broadcast what the browsers should do about a finished task.
    pub fn notify(&self, reload: &Reload) {
        for message in reload.messages() {
            tracing::debug!(?message, "broadcasting");
            // the broadcast thread lives as long as the process
            let _ = self.tx.send(message);
        }
    }
}

fn new_thread_ws_incoming(server: TcpListener, clients: Clients) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in server.incoming() {
            let socket = match stream.map(tungstenite::accept) {
                Ok(Ok(socket)) => socket,
                Ok(Err(e)) => {
                    tracing::warn!("websocket handshake failed: {e}");
                    continue;
                }
                Err(e) => {
                    tracing::warn!("websocket connection failed: {e}");
                    continue;
                }
            };

            clients
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(socket);
        }
    })
}

fn new_thread_ws_reload(clients: Clients) -> (Sender<ReloadMessage>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel::<ReloadMessage>();

    let thread = std::thread::spawn(move || {
        while let Ok(message) = rx.recv() {
            let frame = match serde_json::to_string(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("couldn't encode {message:?}: {e}");
                    continue;
                }
            };

            let mut clients = clients.lock().unwrap_or_else(PoisonError::into_inner);
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send(frame.clone().into()) {
                    Ok(_) => {}
                    Err(tungstenite::Error::Io(e)) => {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            broken.push(i);
                        }
                    }
                    Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                        broken.push(i);
                    }
                    Err(e) => {
                        tracing::error!("Error: {e:?}");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            let len = clients.len();
            if len > MAX_CLIENTS {
                for mut socket in clients.drain(0..len - MAX_CLIENTS) {
                    socket.close(None).ok();
                }
            }
        }
    });

    (tx, thread)
}
