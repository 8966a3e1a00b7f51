//! QUIC transport
//!
//! Encryption, connection setup and stream multiplexing belong to the QUIC
//! implementation behind [`QuicTransport`]. This module only applies the
//! benchmark semantics on top of it:
//!
//! - Streaming: one stream, sequential writes, end-of-stream flag on the last
//!   write instead of a `FIN` message.
//! - Stop-and-wait: one fresh stream per block with end-of-stream set; the
//!   client waits for `ACK` on that stream before opening the next one.
//! - The server session ends on the transport's connection-termination event.

pub mod endpoint;
pub mod tls;

use std::future::Future;

use bytes::Bytes;
use tracing::{debug, info};

use crate::handshake::StopAndWait;
use crate::message::ControlMessage;
use crate::session::{Mode, Protocol, SessionParams};
use crate::stats::{Role, TransferReport, TransferStats};
use crate::{Config, Error, Result};

pub use endpoint::{run_client, QuicServer, QuinnTransport};

/// Stream identifier as assigned by the transport
pub type StreamId = u64;

/// Notifications raised by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuicEvent {
    /// Bytes arrived on a stream; `end_stream` marks the peer's final write
    StreamData {
        stream_id: StreamId,
        data: Bytes,
        end_stream: bool,
    },

    /// The connection is gone
    ConnectionTerminated { reason: String },
}

/// What the benchmark needs from a QUIC implementation
pub trait QuicTransport {
    /// Allocate the next locally-initiated bidirectional stream
    fn open_stream(&mut self) -> impl Future<Output = Result<StreamId>> + Send;

    /// Write `data`; `end_stream` finishes the stream after it
    fn send_stream_data(
        &mut self,
        stream_id: StreamId,
        data: Bytes,
        end_stream: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Next inbound event
    fn next_event(&mut self) -> impl Future<Output = Result<QuicEvent>> + Send;

    /// Flush outstanding stream data and close the connection
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Wait until the server has answered `ACK` on `stream_id`
async fn wait_for_ack<T: QuicTransport>(transport: &mut T, stream_id: StreamId) -> Result<()> {
    let mut received = Vec::with_capacity(ControlMessage::Ack.as_bytes().len());

    loop {
        match transport.next_event().await? {
            QuicEvent::StreamData {
                stream_id: id,
                data,
                ..
            } if id == stream_id => {
                received.extend_from_slice(&data);
                if ControlMessage::parse(&received) == Some(ControlMessage::Ack) {
                    return Ok(());
                }
            }
            QuicEvent::StreamData { .. } => {}
            QuicEvent::ConnectionTerminated { reason } => {
                debug!("Connection terminated while waiting for ACK: {}", reason);
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

/// Client half of a session over an established connection
///
/// `stats` is expected to be running already so connection setup counts
/// toward the transfer time.
pub async fn run_client_session<T: QuicTransport>(
    transport: &mut T,
    config: &Config,
    params: &SessionParams,
    stats: &mut TransferStats,
) -> Result<()> {
    let payload = params.payload();

    match params.mode {
        Mode::Streaming => {
            let stream_id = transport.open_stream().await?;
            for len in params.blocks() {
                transport
                    .send_stream_data(stream_id, payload.slice(..len), false)
                    .await?;
                stats.record(len);
            }
            transport
                .send_stream_data(stream_id, Bytes::new(), true)
                .await?;
        }
        Mode::StopAndWait => {
            let mut saw = StopAndWait::new(config.ack_timeout());
            for len in params.blocks() {
                let stream_id = transport.open_stream().await?;
                transport
                    .send_stream_data(stream_id, payload.slice(..len), true)
                    .await?;
                saw.on_sent(len);
                saw.await_ack(wait_for_ack(transport, stream_id)).await?;
                stats.record(len);
            }
        }
    }

    Ok(())
}

/// Outcome of one event on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Continue,
    /// Send `ACK` on this stream and finish it
    Reply(StreamId),
    Terminated,
}

/// Server-side session state, fed one transport event at a time
#[derive(Debug)]
pub struct QuicServerSession {
    mode: Mode,
    stats: TransferStats,
    /// Highest stream answered so far; stream ids only grow
    last_acked: Option<StreamId>,
}

impl QuicServerSession {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            stats: TransferStats::new(),
            last_acked: None,
        }
    }

    /// Count data and decide whether a stream is due its `ACK`
    ///
    /// Empty end-of-stream notifications are not messages.
    pub fn handle_event(&mut self, event: QuicEvent) -> SessionStep {
        match event {
            QuicEvent::StreamData {
                stream_id,
                data,
                end_stream,
            } => {
                if !data.is_empty() {
                    self.stats.record(data.len());
                }

                let fresh = !matches!(self.last_acked, Some(last) if stream_id <= last);
                if self.mode == Mode::StopAndWait && end_stream && fresh {
                    self.last_acked = Some(stream_id);
                    return SessionStep::Reply(stream_id);
                }
                SessionStep::Continue
            }
            QuicEvent::ConnectionTerminated { reason } => {
                info!("Connection terminated: {}", reason);
                SessionStep::Terminated
            }
        }
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn report(&self) -> TransferReport {
        self.stats.finish(Role::Server, Protocol::Quic, self.mode)
    }
}

/// Drive a server session until the connection terminates
pub async fn serve_session<T: QuicTransport>(transport: &mut T, mode: Mode) -> Result<TransferReport> {
    let mut session = QuicServerSession::new(mode);

    loop {
        let event = transport.next_event().await?;
        match session.handle_event(event) {
            SessionStep::Continue => {}
            SessionStep::Reply(stream_id) => {
                transport
                    .send_stream_data(
                        stream_id,
                        Bytes::from_static(ControlMessage::Ack.as_bytes()),
                        true,
                    )
                    .await?;
            }
            SessionStep::Terminated => break,
        }
    }

    Ok(session.report())
}
