//! blockbench QUIC client
//!
//! Same as `blockbench-client quic ...` with the protocol implied.
//!
//! Usage:
//!   blockbench-quic-client [mode] <server_ip> <block_size> <total_bytes_to_send>
//!
//! Example:
//!   blockbench-quic-client sw 192.168.1.10 1200 500MB

use tracing::error;

use blockbench::cli::{self, Command};
use blockbench::{driver, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let progname = args.first().map(String::as_str).unwrap_or("blockbench-quic-client");

    let params = match cli::parse_quic_client_args(&args) {
        Ok(Command::Run(params)) => params,
        Ok(Command::Help) => {
            println!("{}", cli::quic_client_usage(progname));
            std::process::exit(0);
        }
        Err(e) => {
            if let Some(reason) = &e.reason {
                println!("{}", reason);
            }
            println!("{}", cli::quic_client_usage(progname));
            std::process::exit(1);
        }
    };

    driver::init_tracing()?;

    let report = driver::run_client(&Config::default(), &params)
        .await
        .inspect_err(|e| error!("{}", e))?;

    println!("{}", report);
    Ok(())
}
