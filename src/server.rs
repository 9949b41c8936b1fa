//! TCP Server
//!
//! Binds the listener and spawns one connection task per accepted client.
//! The accept loop runs forever; a failed `accept` is logged and retried.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionConfig, ConnectionStats};
use crate::storage::CacheStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A memcached-protocol server over a shared store.
pub struct Server {
    config: Config,
    store: Arc<dyn CacheStore>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Creates a server; nothing is bound until [`Server::run`].
    pub fn new(config: Config, store: Arc<dyn CacheStore>) -> Self {
        Self {
            config,
            store,
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    /// Connection statistics shared with every connection task.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Binds the configured address and accepts connections forever.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener).await
    }

    /// Accepts connections forever on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        info!(addr = %listener.local_addr()?, "Server is listening");

        let connection_config: ConnectionConfig = self.config.connection();

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let handler = CommandHandler::new(Arc::clone(&self.store));
                    let stats = Arc::clone(&self.stats);

                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        handler,
                        connection_config,
                        stats,
                    ));
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::net::SocketAddr;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start_server() -> (SocketAddr, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Server::new(Config::default(), Arc::new(MemoryStore::new()));
        let stats = server.stats();
        tokio::spawn(server.serve(listener));

        (addr, stats)
    }

    #[tokio::test]
    async fn test_clients_share_the_store() {
        let (addr, stats) = start_server().await;

        let mut writer = TcpStream::connect(addr).await.unwrap();
        writer.write_all(b"set shared 5 0 3\r\nabc\r\n").await.unwrap();
        let mut buf = [0u8; 8];
        writer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"STORED\r\n");

        let mut reader = TcpStream::connect(addr).await.unwrap();
        reader.write_all(b"get shared\r\n").await.unwrap();
        let expected = b"VALUE shared 5 3\r\nabc\r\nEND\r\n";
        let mut buf = vec![0u8; expected.len()];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[..], &expected[..]);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = Config {
            host: "127.0.0.1".to_string(),
            port,
            ..Config::default()
        };
        let server = Server::new(config, Arc::new(MemoryStore::new()));

        let result = server.run().await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
