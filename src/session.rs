//! Session parameters and block planning
//!
//! A session sends `total_bytes` in blocks of `block_size`; the final block is
//! cut down to whatever remains so the target is hit exactly.

use std::fmt;
use std::net::IpAddr;

use bytes::Bytes;

use crate::{FIVE_HUNDRED_MB, ONE_GB};

/// Transport substrate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Quic,
}

impl Protocol {
    /// Parse a CLI token (case-insensitive)
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            "quic" => Some(Self::Quic),
            _ => None,
        }
    }

    /// Whether the transport accepts a mode argument
    pub fn has_modes(self) -> bool {
        !matches!(self, Self::Tcp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Quic => "QUIC",
        };
        f.write_str(name)
    }
}

/// Transfer discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Send blocks back to back
    #[default]
    Streaming,

    /// One block in flight, wait for ACK before the next
    StopAndWait,
}

impl Mode {
    /// Parse `st` / `sw` (case-insensitive)
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "st" => Some(Self::Streaming),
            "sw" => Some(Self::StopAndWait),
            _ => None,
        }
    }

    /// Label printed in the summary for a given transport
    pub fn label(self, protocol: Protocol) -> &'static str {
        match (protocol, self) {
            (Protocol::Tcp, _) => "Streaming (default)",
            (_, Self::Streaming) => "Streaming",
            (_, Self::StopAndWait) => "Stop and Wait",
        }
    }
}

/// Total byte target accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteTarget {
    OneGb,
    FiveHundredMb,
}

impl ByteTarget {
    /// `1GB` selects 1 GiB; every other token falls back to 500 MiB
    pub fn parse(token: &str) -> Self {
        if token == "1GB" {
            Self::OneGb
        } else {
            Self::FiveHundredMb
        }
    }

    pub fn bytes(self) -> u64 {
        match self {
            Self::OneGb => ONE_GB,
            Self::FiveHundredMb => FIVE_HUNDRED_MB,
        }
    }
}

/// Immutable parameters of one client run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub protocol: Protocol,
    pub mode: Mode,
    pub server_ip: IpAddr,
    pub block_size: usize,
    pub total_bytes: u64,
}

impl SessionParams {
    /// Zero-filled payload of one full block
    pub fn payload(&self) -> Bytes {
        Bytes::from(vec![0u8; self.block_size])
    }

    /// Block sizes this session will send
    pub fn blocks(&self) -> BlockPlan {
        BlockPlan::new(self.block_size, self.total_bytes)
    }

    /// Number of blocks (messages) the client sends
    pub fn block_count(&self) -> u64 {
        block_count(self.block_size, self.total_bytes)
    }
}

/// `ceil(total / block_size)`
pub fn block_count(block_size: usize, total_bytes: u64) -> u64 {
    if block_size == 0 {
        return 0;
    }
    total_bytes.div_ceil(block_size as u64)
}

/// Iterator over block lengths: `min(block_size, remaining)` until nothing remains
#[derive(Debug, Clone)]
pub struct BlockPlan {
    block_size: usize,
    remaining: u64,
}

impl BlockPlan {
    pub fn new(block_size: usize, total_bytes: u64) -> Self {
        Self {
            block_size,
            // a zero block size would never make progress
            remaining: if block_size == 0 { 0 } else { total_bytes },
        }
    }
}

impl Iterator for BlockPlan {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let len = self.remaining.min(self.block_size as u64) as usize;
        self.remaining -= len as u64;
        Some(len)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = block_count(self.block_size, self.remaining) as usize;
        (n, Some(n))
    }
}
