//! TCP transport
//!
//! One connection, no framing. The server counts every read as a message, so
//! its message count depends on how the kernel chunks the stream.

use std::io::ErrorKind;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::session::{Mode, Protocol, SessionParams};
use crate::stats::{Role, TransferReport, TransferStats};
use crate::{Config, Error, Result};

/// Single-connection TCP receiver
pub struct TcpServer {
    listener: TcpListener,
    recv_buffer_size: usize,
}

impl TcpServer {
    /// Bind the listening socket
    pub async fn bind(config: &Config) -> Result<Self> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        info!("Listening on port {}...", listener.local_addr()?.port());

        Ok(Self {
            listener,
            recv_buffer_size: config.recv_buffer_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one connection and drain it until the peer shuts down
    pub async fn run(self) -> Result<TransferReport> {
        let (mut stream, peer) = self.listener.accept().await?;
        info!("Connection accepted from {}", peer.ip());

        let mut stats = TransferStats::new();
        stats.start();

        let mut buf = vec![0u8; self.recv_buffer_size];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            stats.record(n);
        }

        debug!("Peer {} closed the connection", peer);
        Ok(stats.finish(Role::Server, Protocol::Tcp, Mode::Streaming))
    }
}

/// Connect and stream `params.total_bytes` in blocks
pub async fn run_client(config: &Config, params: &SessionParams) -> Result<TransferReport> {
    let addr = config.peer_addr(params.server_ip);
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|source| Error::Connect { addr, source })?;
    info!("Connected to {}", addr);

    let mut stats = TransferStats::new();
    stats.start();
    send_blocks(&mut stream, params, &mut stats).await?;

    let report = stats.finish(Role::Client, Protocol::Tcp, Mode::Streaming);
    stream.shutdown().await?;
    Ok(report)
}

/// Write every block of the session, one `write_all` per block
///
/// A write that makes no progress means the peer is gone.
pub async fn send_blocks<W>(writer: &mut W, params: &SessionParams, stats: &mut TransferStats) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = params.payload();

    for len in params.blocks() {
        writer
            .write_all(&payload[..len])
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::WriteZero => Error::ConnectionBroken,
                _ => Error::Io(e),
            })?;
        stats.record(len);
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Writer whose peer accepts nothing
    struct StalledWriter;

    impl AsyncWrite for StalledWriter {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(0))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn params(block_size: usize, total_bytes: u64) -> SessionParams {
        SessionParams {
            protocol: Protocol::Tcp,
            mode: Mode::Streaming,
            server_ip: "127.0.0.1".parse().unwrap(),
            block_size,
            total_bytes,
        }
    }

    #[tokio::test]
    async fn test_tcp_transfer_totals() {
        let mut config = Config::loopback();
        let server = TcpServer::bind(&config).await.unwrap();
        config.port = server.local_addr().unwrap().port();

        let server_task = tokio::spawn(server.run());

        let params = params(1024, 1_000_000);
        let client = run_client(&config, &params).await.unwrap();
        assert_eq!(client.total_bytes, 1_000_000);
        assert_eq!(client.total_messages, 977);

        let server = server_task.await.unwrap().unwrap();
        assert_eq!(server.total_bytes, 1_000_000);
        assert!(server.total_messages >= 1);
        assert_eq!(server.role, Role::Server);
        assert_eq!(server.mode, Mode::Streaming);
    }

    #[tokio::test]
    async fn test_tcp_connect_failure() {
        // bind then drop to find a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config {
            port,
            ..Config::loopback()
        };
        let err = run_client(&config, &params(10, 100)).await.unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
    }

    #[tokio::test]
    async fn test_zero_length_write_is_broken_connection() {
        let mut stats = TransferStats::new();
        stats.start();

        let err = send_blocks(&mut StalledWriter, &params(512, 4096), &mut stats)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionBroken));
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[tokio::test]
    async fn test_send_blocks_counts_each_block() {
        let mut sink = Vec::new();
        let mut stats = TransferStats::new();
        stats.start();

        send_blocks(&mut sink, &params(300, 1000), &mut stats).await.unwrap();
        assert_eq!(sink.len(), 1000);
        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.total_bytes, 1000);
    }
}
