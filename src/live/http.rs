use std::net::SocketAddr;
use std::thread;

use axum::Router;
use camino::Utf8PathBuf;
use console::style;
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::Config;
use crate::error::ServeError;

/// Static file server over the output directory.
pub struct Server {
    address: SocketAddr,
    handle: thread::JoinHandle<Result<(), ServeError>>,
}

impl Server {
    /// Bind the configured port and serve from a background thread. The port
    /// is taken before returning, so a clash is reported here.
    pub fn start(config: &Config) -> Result<Self, ServeError> {
        let address = SocketAddr::from(([127, 0, 0, 1], config.server.port));
        let listener =
            std::net::TcpListener::bind(address).map_err(|e| ServeError::Bind(address, e))?;
        listener.set_nonblocking(true)?;

        let address = listener.local_addr()?;
        let dist = config.resolve(&config.paths.dist.base);
        let url = format!("http://localhost:{}/", address.port());

        info!(url = %style(&url).yellow(), "starting a HTTP server");

        let handle = thread::spawn(move || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(ServeError::Runtime)?
                .block_on(serve(listener, dist))
        });

        if config.server.open
            && let Err(e) = open::that(&url)
        {
            tracing::warn!("couldn't open a browser: {e}");
        }

        Ok(Self { address, handle })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Block until the server stops.
    pub fn wait(self) -> Result<(), ServeError> {
        self.handle
            .join()
            .map_err(|_| ServeError::Panicked("http"))?
    }
}

async fn serve(listener: std::net::TcpListener, dist: Utf8PathBuf) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::from_std(listener)?;

    let router = Router::new()
        // everything is a file in the output directory
        .fallback_service(ServeDir::new(dist));

    axum::serve(listener, router).await?;

    Ok(())
}
