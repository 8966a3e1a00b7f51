//! # blockbench
//!
//! Block-oriented throughput benchmark over TCP, UDP and QUIC
//!
//! ## Features
//! - **Fixed blocks**: zero-filled payload, final block cut to hit the byte target exactly
//! - **Streaming**: blocks back to back, no per-block feedback
//! - **Stop-and-wait**: one block in flight, 2 s ACK timeout, no retransmission
//! - **Explicit teardown**: `FIN` / `ACK_FIN` over UDP, end-of-stream and connection close over QUIC
//! - **Single session**: one peer per server run, summary printed on completion

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod handshake;
pub mod message;
pub mod quic;
pub mod session;
pub mod stats;
pub mod tcp;
pub mod udp;

pub use config::Config;
pub use error::{Error, Result};
pub use message::ControlMessage;
pub use session::{ByteTarget, Mode, Protocol, SessionParams};
pub use stats::{TransferReport, TransferStats};

/// Port used by every transport
pub const PORT_NUM: u16 = 5001;

/// Largest block size (bytes); also the server read buffer size
pub const MAX_BLOCK_SIZE: usize = 65536;

/// `1GB` byte target
pub const ONE_GB: u64 = 1_073_741_824;

/// `500MB` byte target
pub const FIVE_HUNDRED_MB: u64 = 524_288_000;

/// Stop-and-wait ACK timeout (milliseconds)
pub const ACK_TIMEOUT_MS: u64 = 2000;
