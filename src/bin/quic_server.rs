//! blockbench QUIC server
//!
//! Same as `blockbench-server quic ...` with the protocol implied. Without
//! certificate files a self-signed certificate is generated for the run.
//!
//! Usage:
//!   blockbench-quic-server <mode> [<certificate> <private_key>]
//!   blockbench-quic-server <certificate> <private_key>
//!
//! Example:
//!   blockbench-quic-server sw cert.pem key.pem

use tracing::error;

use blockbench::cli::{self, Command};
use blockbench::{driver, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let progname = args.first().map(String::as_str).unwrap_or("blockbench-quic-server");

    let server_args = match cli::parse_quic_server_args(&args) {
        Ok(Command::Run(server_args)) => server_args,
        Ok(Command::Help) => {
            println!("{}", cli::quic_server_usage(progname));
            std::process::exit(0);
        }
        Err(e) => {
            if let Some(reason) = &e.reason {
                println!("{}", reason);
            }
            println!("{}", cli::quic_server_usage(progname));
            std::process::exit(1);
        }
    };

    driver::init_tracing()?;

    let report = driver::run_server(&Config::default(), &server_args)
        .await
        .inspect_err(|e| error!("{}", e))?;

    println!("{}", report);
    Ok(())
}
