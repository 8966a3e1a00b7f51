//! blockbench client (sender)
//!
//! Streams a fixed volume of zero-filled blocks to a blockbench server and
//! prints how long it took.
//!
//! Usage:
//!   blockbench-client <protocol> [mode] <ip_address> <block_size> <total_bytes_to_send>
//!
//! Examples:
//!   # TCP, 1 KiB blocks, 500 MiB
//!   blockbench-client tcp 192.168.1.10 1024 500MB
//!
//!   # UDP stop-and-wait, 4 KiB blocks, 1 GiB
//!   blockbench-client udp sw 192.168.1.10 4096 1GB

use tracing::error;

use blockbench::cli::{self, Command};
use blockbench::{driver, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let progname = args.first().map(String::as_str).unwrap_or("blockbench-client");

    // argument errors are reported before any I/O
    let params = match cli::parse_client_args(&args) {
        Ok(Command::Run(params)) => params,
        Ok(Command::Help) => {
            println!("{}", cli::client_usage(progname));
            std::process::exit(0);
        }
        Err(e) => {
            if let Some(reason) = &e.reason {
                println!("{}", reason);
            }
            println!("{}", cli::client_usage(progname));
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
