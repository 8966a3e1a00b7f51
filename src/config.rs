//! Runtime configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::{ACK_TIMEOUT_MS, MAX_BLOCK_SIZE, PORT_NUM};

/// blockbench tunables
///
/// The CLI never changes these; they exist so tests (and embedders) can run
/// a session on an ephemeral port with a short ACK timeout.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port used by both client and server
    pub port: u16,

    /// Local address the server binds to
    pub bind_ip: IpAddr,

    /// Stop-and-wait ACK timeout (milliseconds)
    pub ack_timeout_ms: u64,

    /// Server receive buffer size (bytes)
    pub recv_buffer_size: usize,

    /// SNI name the QUIC client presents
    pub quic_server_name: String,

    /// ALPN token negotiated by both QUIC endpoints
    pub quic_alpn: Vec<u8>,

    /// PEM certificate chain for the QUIC server
    /// None means a self-signed certificate is generated per run
    pub quic_cert_path: Option<PathBuf>,

    /// PEM private key for the QUIC server
    pub quic_key_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: PORT_NUM,
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ack_timeout_ms: ACK_TIMEOUT_MS, // 2 s
            recv_buffer_size: MAX_BLOCK_SIZE,
            quic_server_name: "localhost".to_string(),
            quic_alpn: b"blockbench".to_vec(),
            quic_cert_path: None,
            quic_key_path: None,
        }
    }
}

impl Config {
    /// Address the server listens on
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Address the client sends to for a given server IP
    pub fn peer_addr(&self, ip: IpAddr) -> SocketAddr {
        SocketAddr::new(ip, self.port)
    }

    /// Stop-and-wait ACK timeout
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Loopback configuration on an OS-assigned port
    pub fn loopback() -> Self {
        Self {
            port: 0,
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 5001);
        assert_eq!(config.ack_timeout(), Duration::from_secs(2));
        assert_eq!(config.recv_buffer_size, 65536);
        assert_eq!(config.listen_addr(), "0.0.0.0:5001".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_peer_addr_uses_configured_port() {
        let config = Config {
            port: 6000,
            ..Config::default()
        };
        let ip: IpAddr = "10.0.0.7".parse().unwrap();
        assert_eq!(config.peer_addr(ip), "10.0.0.7:6000".parse::<SocketAddr>().unwrap());
    }
}
