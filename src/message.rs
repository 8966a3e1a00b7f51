//! Control messages on the wire
//!
//! UDP and QUIC sessions share three fixed tokens; every other byte on the wire
//! is opaque payload.

/// End of session (client → server)
pub const FIN: &[u8] = b"FIN";

/// Per-block acknowledgment (server → client)
pub const ACK: &[u8] = b"ACK";

/// Acknowledgment of FIN (server → client)
pub const ACK_FIN: &[u8] = b"ACK_FIN";

/// Control message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    Fin,
    Ack,
    AckFin,
}

impl ControlMessage {
    /// Wire bytes of the token
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Fin => FIN,
            Self::Ack => ACK,
            Self::AckFin => ACK_FIN,
        }
    }

    /// Exact match only: a longer datagram that starts with `FIN` is payload
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"FIN" => Some(Self::Fin),
            b"ACK" => Some(Self::Ack),
            b"ACK_FIN" => Some(Self::AckFin),
            _ => None,
        }
    }
}

/// What the server makes of one inbound datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Session terminator, never counted
    Fin,

    /// Payload of the given length
    Payload(usize),
}

impl Inbound {
    /// Only the exact `FIN` token terminates; `ACK`-shaped payload is still payload
    pub fn classify(datagram: &[u8]) -> Self {
        if ControlMessage::parse(datagram) == Some(ControlMessage::Fin) {
            Self::Fin
        } else {
            Self::Payload(datagram.len())
        }
    }
}
