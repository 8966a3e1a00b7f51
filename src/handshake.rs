//! Stop-and-wait acknowledgment
//!
//! # Client
//! - At most one block is unacknowledged ([`PendingAck`]).
//! - A block may only be sent when nothing is pending.
//! - Any reply within the timeout acknowledges the pending block.
//! - A timeout ends the session; nothing is retransmitted.
//!
//! # Server
//! - Every payload datagram is answered with `ACK` in stop-and-wait mode.
//! - `FIN` is answered with `ACK_FIN` in both modes and ends the session.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::message::{ControlMessage, Inbound};
use crate::session::Mode;
use crate::{Error, Result};

/// A sent block still waiting for its ACK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAck {
    /// Zero-based block index
    pub block: u64,

    /// Bytes carried by the block
    pub len: usize,

    /// When the block left
    pub sent_at: Instant,
}

/// Client-side stop-and-wait state
#[derive(Debug)]
pub struct StopAndWait {
    timeout: Duration,
    next_block: u64,
    pending: Option<PendingAck>,
}

impl StopAndWait {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            next_block: 0,
            pending: None,
        }
    }

    /// Register a block that just went on the wire
    ///
    /// Panics in debug builds if the previous block was never acknowledged.
    pub fn on_sent(&mut self, len: usize) -> u64 {
        debug_assert!(
            self.pending.is_none(),
            "block sent while another is still unacknowledged"
        );
        let block = self.next_block;
        self.pending = Some(PendingAck {
            block,
            len,
            sent_at: Instant::now(),
        });
        self.next_block += 1;
        block
    }

    /// Wait for `reply` to resolve, bounded by the ACK timeout
    ///
    /// Whatever `reply` yields counts as the acknowledgment; its content is
    /// not inspected here. Must follow [`StopAndWait::on_sent`].
    pub async fn await_ack<F, T>(&mut self, reply: F) -> Result<(PendingAck, T)>
    where
        F: Future<Output = Result<T>>,
    {
        debug_assert!(self.pending.is_some(), "await_ack without a block in flight");
        let pending = self.pending.take().ok_or(Error::NothingPending)?;

        match tokio::time::timeout(self.timeout, reply).await {
            Ok(Ok(value)) => {
                debug!(
                    "ACK for block {} after {:.3}ms",
                    pending.block,
                    pending.sent_at.elapsed().as_secs_f64() * 1000.0
                );
                Ok((pending, value))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::AckTimeout {
                block: pending.block,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Wait for the reply to `FIN`, bounded by the same timeout
    pub async fn await_fin_ack<F, T>(&self, reply: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, reply).await {
            Ok(result) => result,
            Err(_) => Err(Error::FinAckTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    #[cfg(test)]
    fn pending(&self) -> Option<&PendingAck> {
        self.pending.as_ref()
    }
}

/// Server reply to one inbound datagram
pub fn server_reply(mode: Mode, inbound: Inbound) -> Option<ControlMessage> {
    match (inbound, mode) {
        (Inbound::Fin, _) => Some(ControlMessage::AckFin),
        (Inbound::Payload(_), Mode::StopAndWait) => Some(ControlMessage::Ack),
        (Inbound::Payload(_), Mode::Streaming) => None,
    }
}
