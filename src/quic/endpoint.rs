//! quinn-backed [`QuicTransport`]
//!
//! Every stream gets a reader task that turns `read_chunk` results into
//! [`QuicEvent`]s on one channel, so the session sees a single ordered event
//! feed much like an event-callback QUIC stack would deliver it.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use quinn::{Connection, Endpoint, RecvStream, SendStream, VarInt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{run_client_session, serve_session, tls, QuicEvent, QuicTransport, StreamId};
use crate::session::{Mode, Protocol, SessionParams};
use crate::stats::{Role, TransferReport, TransferStats};
use crate::{Config, Error, Result, MAX_BLOCK_SIZE};

/// Event channel depth
const EVENT_QUEUE_SIZE: usize = 1024;

/// Upper bound on waiting for the peer to acknowledge the last stream bytes
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Items flowing from background tasks to the transport
enum Notice {
    /// A peer-initiated stream; its send half is kept for replies
    Accepted(StreamId, SendStream),
    Event(QuicEvent),
}

fn stream_id_of(send: &SendStream) -> StreamId {
    VarInt::from(send.id()).into_inner()
}

/// Forward everything read from `recv` as events
async fn pump_stream(stream_id: StreamId, mut recv: RecvStream, tx: mpsc::Sender<Notice>) {
    loop {
        match recv.read_chunk(MAX_BLOCK_SIZE, true).await {
            Ok(Some(chunk)) => {
                let event = QuicEvent::StreamData {
                    stream_id,
                    data: chunk.bytes,
                    end_stream: false,
                };
                if tx.send(Notice::Event(event)).await.is_err() {
                    return;
                }
            }
            Ok(None) => {
                let event = QuicEvent::StreamData {
                    stream_id,
                    data: Bytes::new(),
                    end_stream: true,
                };
                let _ = tx.send(Notice::Event(event)).await;
                return;
            }
            Err(e) => {
                debug!("Stream {} read ended: {}", stream_id, e);
                return;
            }
        }
    }
}

/// Accept peer streams until the connection ends, then report termination
///
/// Termination is only announced after every reader has finished, so no
/// stream data is reported after it.
async fn accept_streams(connection: Connection, tx: mpsc::Sender<Notice>) {
    let mut readers: Vec<JoinHandle<()>> = Vec::new();

    let reason = loop {
        match connection.accept_bi().await {
            Ok((send, recv)) => {
                let stream_id = stream_id_of(&send);
                if tx.send(Notice::Accepted(stream_id, send)).await.is_err() {
                    return;
                }
                readers.push(tokio::spawn(pump_stream(stream_id, recv, tx.clone())));
                readers.retain(|r| !r.is_finished());
            }
            Err(e) => break e.to_string(),
        }
    };

    for reader in readers {
        let _ = reader.await;
    }
    let _ = tx
        .send(Notice::Event(QuicEvent::ConnectionTerminated { reason }))
        .await;
}

/// Report termination of a client connection
async fn watch_connection(connection: Connection, tx: mpsc::Sender<Notice>) {
    let reason = connection.closed().await.to_string();
    let _ = tx
        .send(Notice::Event(QuicEvent::ConnectionTerminated { reason }))
        .await;
}

/// One QUIC connection exposed through [`QuicTransport`]
pub struct QuinnTransport {
    endpoint: Endpoint,
    connection: Connection,
    send_streams: HashMap<StreamId, SendStream>,
    /// Most recently finished stream, kept so `close` can wait for its delivery
    last_finished: Option<SendStream>,
    notices_tx: mpsc::Sender<Notice>,
    notices_rx: mpsc::Receiver<Notice>,
    background: JoinHandle<()>,
}

impl QuinnTransport {
    /// Wrap a connection this side initiated
    pub fn client(endpoint: Endpoint, connection: Connection) -> Self {
        let (notices_tx, notices_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let background = tokio::spawn(watch_connection(connection.clone(), notices_tx.clone()));
        Self {
            endpoint,
            connection,
            send_streams: HashMap::new(),
            last_finished: None,
            notices_tx,
            notices_rx,
            background,
        }
    }

    /// Wrap a connection accepted from a peer
    pub fn server(endpoint: Endpoint, connection: Connection) -> Self {
        let (notices_tx, notices_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let background = tokio::spawn(accept_streams(connection.clone(), notices_tx.clone()));
        Self {
            endpoint,
            connection,
            send_streams: HashMap::new(),
            last_finished: None,
            notices_tx,
            notices_rx,
            background,
        }
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.connection.remote_address()
    }
}

impl QuicTransport for QuinnTransport {
    async fn open_stream(&mut self) -> Result<StreamId> {
        let (send, recv) = self.connection.open_bi().await?;
        let stream_id = stream_id_of(&send);
        self.send_streams.insert(stream_id, send);
        tokio::spawn(pump_stream(stream_id, recv, self.notices_tx.clone()));
        Ok(stream_id)
    }

    async fn send_stream_data(
        &mut self,
        stream_id: StreamId,
        data: Bytes,
        end_stream: bool,
    ) -> Result<()> {
        if end_stream {
            let mut send = self
                .send_streams
                .remove(&stream_id)
                .ok_or(Error::UnknownStream { stream_id })?;
            if !data.is_empty() {
                send.write_all(&data).await?;
            }
            send.finish()?;
            // the previous one is dropped; quinn keeps delivering it
            self.last_finished = Some(send);
            return Ok(());
        }

        let send = self
            .send_streams
            .get_mut(&stream_id)
            .ok_or(Error::UnknownStream { stream_id })?;
        send.write_all(&data).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<QuicEvent> {
        loop {
            match self.notices_rx.recv().await {
                Some(Notice::Accepted(stream_id, send)) => {
                    self.send_streams.insert(stream_id, send);
                }
                Some(Notice::Event(event)) => return Ok(event),
                None => return Err(Error::ConnectionClosed),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut send) = self.last_finished.take() {
            match tokio::time::timeout(DRAIN_TIMEOUT, send.stopped()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!("Final stream: {}", e),
                Err(_) => warn!("Peer did not acknowledge the final stream in time"),
            }
        }

        self.connection.close(VarInt::from_u32(0), b"done");
        self.background.abort();
        self.endpoint.wait_idle().await;
        Ok(())
    }
}

/// Single-connection QUIC receiver
pub struct QuicServer {
    endpoint: Endpoint,
    mode: Mode,
}

impl QuicServer {
    /// Bind the endpoint with the configured (or a generated) certificate
    pub fn bind(config: &Config, mode: Mode) -> Result<Self> {
        let addr = config.listen_addr();
        let server_config = tls::server_config(config)?;
        let endpoint =
            Endpoint::server(server_config, addr).map_err(|source| Error::Bind { addr, source })?;

        info!("QUIC server listening on port {}...", endpoint.local_addr()?.port());

        Ok(Self { endpoint, mode })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }

    /// Serve exactly one connection
    pub async fn run(self) -> Result<TransferReport> {
        let incoming = self.endpoint.accept().await.ok_or(Error::ConnectionClosed)?;
        let connection = incoming.await?;

        let mut transport = QuinnTransport::server(self.endpoint.clone(), connection);
        info!("Connection accepted from {}", transport.remote_address().ip());
        let report = serve_session(&mut transport, self.mode).await?;

        self.endpoint.close(VarInt::from_u32(0), b"done");
        Ok(report)
    }
}

fn unspecified_for(ip: IpAddr) -> SocketAddr {
    match ip {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

/// Connect, send `params.total_bytes`, close
///
/// The clock covers the handshake and the final drain as well as the data.
pub async fn run_client(config: &Config, params: &SessionParams) -> Result<TransferReport> {
    let server_addr = config.peer_addr(params.server_ip);
    let bind_addr = unspecified_for(params.server_ip);

    let mut endpoint = Endpoint::client(bind_addr).map_err(|source| Error::Bind {
        addr: bind_addr,
        source,
    })?;
    endpoint.set_default_client_config(tls::client_config(config)?);

    let mut stats = TransferStats::new();
    stats.start();

    let connection = endpoint
        .connect(server_addr, &config.quic_server_name)?
        .await?;
    info!("Connected to {}", server_addr);

    let mut transport = QuinnTransport::client(endpoint, connection);
    run_client_session(&mut transport, config, params, &mut stats).await?;
    transport.close().await?;

    Ok(stats.finish(Role::Client, Protocol::Quic, params.mode))
}
