//! Error types

use std::net::SocketAddr;

use thiserror::Error;

/// blockbench error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ERROR binding socket to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("ERROR connecting to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket connection broken")]
    ConnectionBroken,

    #[error("ERROR receiving ACK for block {block}: no reply within {timeout_ms} ms")]
    AckTimeout { block: u64, timeout_ms: u64 },

    #[error("ERROR receiving FIN ACK: no reply within {timeout_ms} ms")]
    FinAckTimeout { timeout_ms: u64 },

    #[error("QUIC connect error: {0}")]
    QuicConnect(#[from] quinn::ConnectError),

    #[error("QUIC connection error: {0}")]
    QuicConnection(#[from] quinn::ConnectionError),

    #[error("QUIC stream write error: {0}")]
    QuicWrite(#[from] quinn::WriteError),

    #[error("QUIC stream already closed: {0}")]
    QuicClosedStream(#[from] quinn::ClosedStream),

    #[error("QUIC crypto configuration error: {0}")]
    QuicCrypto(#[from] quinn::crypto::rustls::NoInitialCipherSuite),

    #[error("unknown QUIC stream: {stream_id}")]
    UnknownStream { stream_id: u64 },

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("certificate generation error: {0}")]
    Certificate(#[from] rcgen::Error),

    #[error("PEM error in {path}: {message}")]
    Pem { path: String, message: String },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("no block is awaiting an ACK")]
    NothingPending,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
