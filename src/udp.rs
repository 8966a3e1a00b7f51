//! UDP transport
//!
//! Streaming mode fires datagrams and never looks back; stop-and-wait mode
//! runs the handshake in [`crate::handshake`] for every block. Both modes close
//! with a `FIN` datagram, answered by `ACK_FIN`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::handshake::{server_reply, StopAndWait};
use crate::message::{ControlMessage, Inbound};
use crate::session::{Mode, Protocol, SessionParams};
use crate::stats::{Role, TransferReport, TransferStats};
use crate::{Config, Error, Result};

/// Large enough for `ACK_FIN`
const REPLY_BUF_SIZE: usize = 16;

/// Single-session UDP receiver
pub struct UdpServer {
    socket: UdpSocket,
    mode: Mode,
    recv_buffer_size: usize,
}

impl UdpServer {
    /// Bind the server socket
    pub async fn bind(config: &Config, mode: Mode) -> Result<Self> {
        let addr = config.listen_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        info!("UDP server listening on port {}...", socket.local_addr()?.port());

        Ok(Self {
            socket,
            mode,
            recv_buffer_size: config.recv_buffer_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until `FIN`
    ///
    /// A lost `FIN` leaves this waiting forever; the transport gives no other
    /// end-of-session signal.
    pub async fn run(self) -> Result<TransferReport> {
        let mut stats = TransferStats::new();
        let mut buf = vec![0u8; self.recv_buffer_size];
        let mut peer: Option<SocketAddr> = None;

        loop {
            let (len, addr) = self.socket.recv_from(&mut buf).await?;
            if peer.is_none() {
                info!("First datagram from {}", addr);
                peer = Some(addr);
            }

            let inbound = Inbound::classify(&buf[..len]);
            if let Inbound::Payload(n) = inbound {
                stats.record(n);
            }

            if let Some(reply) = server_reply(self.mode, inbound) {
                self.socket.send_to(reply.as_bytes(), addr).await?;
            }

            if inbound == Inbound::Fin {
                debug!("FIN from {}, ACK_FIN sent", addr);
                break;
            }
        }

        Ok(stats.finish(Role::Server, Protocol::Udp, self.mode))
    }
}

fn unspecified_for(ip: IpAddr) -> SocketAddr {
    match ip {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

async fn recv_reply(socket: &UdpSocket, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
    Ok(socket.recv_from(buf).await?)
}

/// Send `params.total_bytes` to the server, then run the `FIN` exchange
pub async fn run_client(config: &Config, params: &SessionParams) -> Result<TransferReport> {
    let server_addr = config.peer_addr(params.server_ip);
    let bind_addr = unspecified_for(params.server_ip);
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|source| Error::Bind {
            addr: bind_addr,
            source,
        })?;
    info!("Sending to {} from {}", server_addr, socket.local_addr()?);

    let payload = params.payload();
    let mut stats = TransferStats::new();
    let mut reply_buf = [0u8; REPLY_BUF_SIZE];
    let mut saw = match params.mode {
        Mode::StopAndWait => Some(StopAndWait::new(config.ack_timeout())),
        Mode::Streaming => None,
    };

    stats.start();
    for len in params.blocks() {
        let sent = socket.send_to(&payload[..len], server_addr).await?;
        stats.record(sent);

        if let Some(saw) = saw.as_mut() {
            saw.on_sent(sent);
            saw.await_ack(recv_reply(&socket, &mut reply_buf)).await?;
        }
    }

    socket
        .send_to(ControlMessage::Fin.as_bytes(), server_addr)
        .await?;
    if let Some(saw) = saw.as_ref() {
        let (len, _) = saw.await_fin_ack(recv_reply(&socket, &mut reply_buf)).await?;
        debug!("FIN acknowledged: {:?}", ControlMessage::parse(&reply_buf[..len]));
    }

    Ok(stats.finish(Role::Client, Protocol::Udp, params.mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn params(mode: Mode, block_size: usize, total_bytes: u64) -> SessionParams {
        SessionParams {
            protocol: Protocol::Udp,
            mode,
            server_ip: "127.0.0.1".parse().unwrap(),
            block_size,
            total_bytes,
        }
    }

    async fn start_server(mode: Mode) -> (Config, tokio::task::JoinHandle<Result<TransferReport>>) {
        let mut config = Config::loopback();
        let server = UdpServer::bind(&config, mode).await.unwrap();
        config.port = server.local_addr().unwrap().port();
        (config, tokio::spawn(server.run()))
    }

    #[tokio::test]
    async fn test_stop_and_wait_transfer() {
        let (config, server_task) = start_server(Mode::StopAndWait).await;

        let params = params(Mode::StopAndWait, 4096, 409_700);
        let client = run_client(&config, &params).await.unwrap();
        assert_eq!(client.total_messages, 101);
        assert_eq!(client.total_bytes, 409_700);

        let server = tokio::time::timeout(Duration::from_secs(5), server_task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(server.total_messages, 101);
        assert_eq!(server.total_bytes, 409_700);
        assert_eq!(server.mode, Mode::StopAndWait);
    }

    #[tokio::test]
    async fn test_streaming_excludes_fin() {
        let (config, server_task) = start_server(Mode::Streaming).await;

        // small enough that loopback will not drop anything
        let params = params(Mode::Streaming, 100, 2_050);
        let client = run_client(&config, &params).await.unwrap();
        assert_eq!(client.total_messages, 21);

        let server = tokio::time::timeout(Duration::from_secs(5), server_task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(server.total_bytes, 2_050);
        assert_eq!(server.total_messages, 21);
    }

    #[tokio::test]
    async fn test_server_replies_per_datagram() {
        let (config, server_task) = start_server(Mode::StopAndWait).await;
        let server_addr = config.peer_addr("127.0.0.1".parse().unwrap());

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut buf = [0u8; 16];

        // a 3-byte payload that merely looks like a token is still payload
        socket.send_to(b"ACK", server_addr).await.unwrap();
        let (n, _) = socket.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ACK");

        socket.send_to(&[0u8; 512], server_addr).await.unwrap();
        let (n, _) = socket.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ACK");

        socket.send_to(b"FIN", server_addr).await.unwrap();
        let (n, _) = socket.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ACK_FIN");

        let server = server_task.await.unwrap().unwrap();
        assert_eq!(server.total_messages, 2);
        assert_eq!(server.total_bytes, 515);
    }

    #[tokio::test]
    async fn test_ack_timeout_stops_sending() {
        // a peer that never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = Config {
            port: silent.local_addr().unwrap().port(),
            ack_timeout_ms: 100,
            ..Config::loopback()
        };

        let err = run_client(&config, &params(Mode::StopAndWait, 64, 64 * 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AckTimeout { block: 0, .. }));

        let mut buf = [0u8; 128];
        let (n, _) = silent.recv_from(&mut buf).await.unwrap();
        assert_eq!(n, 64);
        // nothing after the first block
        assert!(silent.try_recv_from(&mut buf).is_err());
    }
}
