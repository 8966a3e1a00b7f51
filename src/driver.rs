//! Protocol dispatch shared by the binaries

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::cli::ServerArgs;
use crate::quic::QuicServer;
use crate::session::{Protocol, SessionParams};
use crate::stats::TransferReport;
use crate::tcp::TcpServer;
use crate::udp::UdpServer;
use crate::{quic, tcp, udp, Config, Result};

/// Install the global subscriber: `RUST_LOG` filter (default `info`), stderr output
///
/// stdout is reserved for the summary.
pub fn init_tracing() -> std::result::Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// Run one client session over the requested transport
pub async fn run_client(config: &Config, params: &SessionParams) -> Result<TransferReport> {
    info!(
        "{} client: {} bytes in blocks of {} ({})",
        params.protocol,
        params.total_bytes,
        params.block_size,
        params.mode.label(params.protocol)
    );

    let report = match params.protocol {
        Protocol::Tcp => tcp::run_client(config, params).await?,
        Protocol::Udp => udp::run_client(config, params).await?,
        Protocol::Quic => quic::run_client(config, params).await?,
    };

    info!("{}", report.log_line());
    Ok(report)
}

/// Bind, serve one session, return its counters
pub async fn run_server(config: &Config, args: &ServerArgs) -> Result<TransferReport> {
    let mut config = config.clone();
    if let Some((cert, key)) = &args.tls_files {
        config.quic_cert_path = Some(cert.clone());
        config.quic_key_path = Some(key.clone());
    }

    let report = match args.protocol {
        Protocol::Tcp => TcpServer::bind(&config).await?.run().await?,
        Protocol::Udp => UdpServer::bind(&config, args.mode).await?.run().await?,
        Protocol::Quic => QuicServer::bind(&config, args.mode)?.run().await?,
    };

    info!("{}", report.log_line());
    Ok(report)
}
