//! blockbench server (receiver)
//!
//! Accepts a single session, counts what arrives and prints the totals.
//!
//! Usage:
//!   blockbench-server <protocol> [mode] [<certificate> <private_key>]
//!
//! Examples:
//!   # TCP
//!   blockbench-server tcp
//!
//!   # UDP stop-and-wait
//!   blockbench-server udp sw
//!
//!   # QUIC streaming with a real certificate
//!   blockbench-server quic st cert.pem key.pem

use tracing::error;

use blockbench::cli::{self, Command};
use blockbench::{driver, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let progname = args.first().map(String::as_str).unwrap_or("blockbench-server");

    let server_args = match cli::parse_server_args(&args) {
        Ok(Command::Run(server_args)) => server_args,
        Ok(Command::Help) => {
            println!("{}", cli::server_usage(progname));
            std::process::exit(0);
        }
        Err(e) => {
            if let Some(reason) = &e.reason {
                println!("{}", reason);
            }
            println!("{}", cli::server_usage(progname));
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
