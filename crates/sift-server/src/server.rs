use std::future::Future;
use std::sync::Arc;

use sift_store::{open_store, DocumentStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::AppState;
use crate::router::build_router;

/// Sift document server.
pub struct SiftServer {
    config: ServerConfig,
    state: AppState,
}

impl SiftServer {
    /// Serve `store` with the given config. `config.store` is not consulted.
    pub fn new(config: ServerConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            state: AppState::new(store),
        }
    }

    /// Open the store described by `config.store` and wrap it in a server.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let store = open_store(&config.store)?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.state.store()
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_body_bytes)
    }

    /// Serve on the configured address until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(
            %addr,
            backend = self.store().backend_name(),
            max_body_bytes = self.config.max_body_bytes,
            "Sift server listening"
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Sift server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "could not listen for Ctrl-C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_store::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    #[test]
    fn server_construction() {
        let server = SiftServer::new(ServerConfig::default(), Arc::new(MemoryStore::new()));
        assert_eq!(server.config().bind_addr, "127.0.0.1:9200".parse().unwrap());
        assert_eq!(server.store().backend_name(), "memory");
    }

    #[test]
    fn from_config_opens_log_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            store: sift_store::StoreConfig::log(dir.path()),
            ..ServerConfig::default()
        };
        let server = SiftServer::from_config(config).unwrap();
        assert_eq!(server.store().backend_name(), "log");
    }

    async fn send(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_over_tcp_and_shuts_down() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = SiftServer::new(ServerConfig::default(), Arc::new(MemoryStore::new()));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_on(listener, async move {
            let _ = stop_rx.await;
        }));

        let body = r#"{"name":"widget"}"#;
        let created = send(
            addr,
            &format!(
                "POST /products/42 HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            ),
        )
        .await;
        assert!(created.starts_with("HTTP/1.1 201"), "{created}");

        let fetched = send(
            addr,
            "GET /products/42 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(fetched.starts_with("HTTP/1.1 200"), "{fetched}");
        assert!(fetched.ends_with(body), "{fetched}");

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
