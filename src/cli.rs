//! Command-line parsing for the four binaries
//!
//! Arguments are positional, so parsing is a straight walk over `argv` like the
//! rest of the tooling that drives these programs expects. Every check happens
//! before any socket is opened.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::session::{ByteTarget, Mode, Protocol, SessionParams};
use crate::MAX_BLOCK_SIZE;

/// Parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<T> {
    Run(T),
    Help,
}

/// Bad invocation; the caller prints the reason (if any) and the usage text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub reason: Option<String>,
}

impl UsageError {
    fn bare() -> Self {
        Self { reason: None }
    }

    fn because(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => f.write_str(reason),
            None => f.write_str("invalid arguments"),
        }
    }
}

impl std::error::Error for UsageError {}

/// Server-side invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerArgs {
    pub protocol: Protocol,
    pub mode: Mode,
    /// PEM certificate and key (QUIC only)
    pub tls_files: Option<(PathBuf, PathBuf)>,
}

fn wants_help(args: &[String]) -> bool {
    args.iter().skip(1).any(|a| a == "-h" || a == "--help")
}

fn parse_ip(token: &str) -> Result<IpAddr, UsageError> {
    token
        .parse()
        .map_err(|_| UsageError::because("Invalid IP address"))
}

fn parse_block_size(token: &str) -> Result<usize, UsageError> {
    let size: i64 = token
        .parse()
        .map_err(|_| UsageError::because("Invalid block size or total bytes"))?;
    if size < 1 || size > MAX_BLOCK_SIZE as i64 {
        return Err(UsageError::because("Invalid block size"));
    }
    Ok(size as usize)
}

fn parse_mode(token: &str) -> Result<Mode, UsageError> {
    Mode::parse(token).ok_or_else(|| UsageError::because("Invalid mode"))
}

/// `<protocol> [mode] <ip_address> <block_size> <total_bytes_to_send>`
pub fn parse_client_args(args: &[String]) -> Result<Command<SessionParams>, UsageError> {
    if wants_help(args) {
        return Ok(Command::Help);
    }
    if args.len() < 5 {
        return Err(UsageError::bare());
    }

    let protocol = Protocol::parse(&args[1]).ok_or_else(|| UsageError::because("Invalid protocol"))?;

    // the mode slot exists only for udp/quic
    let (mode, rest) = match args.len() {
        5 => (Mode::Streaming, &args[2..]),
        6 if protocol.has_modes() => (parse_mode(&args[2])?, &args[3..]),
        _ => return Err(UsageError::bare()),
    };

    Ok(Command::Run(SessionParams {
        protocol,
        mode,
        server_ip: parse_ip(&rest[0])?,
        block_size: parse_block_size(&rest[1])?,
        total_bytes: ByteTarget::parse(&rest[2]).bytes(),
    }))
}

/// `[mode] <server_ip> <block_size> <total_bytes_to_send>`
pub fn parse_quic_client_args(args: &[String]) -> Result<Command<SessionParams>, UsageError> {
    if wants_help(args) {
        return Ok(Command::Help);
    }

    let (mode, rest) = match args.len() {
        4 => (Mode::Streaming, &args[1..]),
        5 => (parse_mode(&args[1])?, &args[2..]),
        _ => return Err(UsageError::bare()),
    };

    Ok(Command::Run(SessionParams {
        protocol: Protocol::Quic,
        mode,
        server_ip: parse_ip(&rest[0])?,
        block_size: parse_block_size(&rest[1])?,
        total_bytes: ByteTarget::parse(&rest[2]).bytes(),
    }))
}

/// `<protocol> [mode] [<certificate> <private_key>]`
pub fn parse_server_args(args: &[String]) -> Result<Command<ServerArgs>, UsageError> {
    if wants_help(args) {
        return Ok(Command::Help);
    }
    if args.len() < 2 {
        return Err(UsageError::bare());
    }

    let protocol = Protocol::parse(&args[1]).ok_or_else(|| UsageError::because("Invalid protocol"))?;

    match protocol {
        Protocol::Tcp => {
            if args.len() > 2 {
                return Err(UsageError::bare());
            }
            Ok(Command::Run(ServerArgs {
                protocol,
                mode: Mode::Streaming,
                tls_files: None,
            }))
        }
        Protocol::Udp => {
            if args.len() != 3 {
                return Err(UsageError::bare());
            }
            Ok(Command::Run(ServerArgs {
                protocol,
                mode: parse_mode(&args[2])?,
                tls_files: None,
            }))
        }
        Protocol::Quic => {
            let tls_files = match args.len() {
                3 => None,
                5 => Some((PathBuf::from(&args[3]), PathBuf::from(&args[4]))),
                _ => return Err(UsageError::bare()),
            };
            Ok(Command::Run(ServerArgs {
                protocol,
                mode: parse_mode(&args[2])?,
                tls_files,
            }))
        }
    }
}

/// `<mode> [<certificate> <private_key>]` or `<certificate> <private_key>`
pub fn parse_quic_server_args(args: &[String]) -> Result<Command<ServerArgs>, UsageError> {
    if wants_help(args) {
        return Ok(Command::Help);
    }

    let (mode, tls_files) = match args.len() {
        2 => (parse_mode(&args[1])?, None),
        3 => (
            Mode::Streaming,
            Some((PathBuf::from(&args[1]), PathBuf::from(&args[2]))),
        ),
        4 => (
            parse_mode(&args[1])?,
            Some((PathBuf::from(&args[2]), PathBuf::from(&args[3]))),
        ),
        _ => return Err(UsageError::bare()),
    };

    Ok(Command::Run(ServerArgs {
        protocol: Protocol::Quic,
        mode,
        tls_files,
    }))
}

pub fn client_usage(progname: &str) -> String {
    format!(
        "Usage: {progname} <protocol> [mode] <ip_address> <block_size> <total_bytes_to_send>\n\
         \x20 protocol: tcp, udp or quic\n\
         \x20 mode (for udp/quic only): streaming (use: st) or stopandwait (use: sw) (default: streaming)\n\
         \x20 block_size: size of each message (1 to {MAX_BLOCK_SIZE})\n\
         \x20 total_bytes_to_send: total number of bytes to send (1GB or 500MB)"
    )
}

pub fn quic_client_usage(progname: &str) -> String {
    format!(
        "Usage: {progname} [mode] <server_ip> <block_size> <total_bytes_to_send>\n\
         \x20 mode: streaming (use: st) or stopandwait (use: sw) (default: streaming)\n\
         \x20 block_size: size of each message (1 to {MAX_BLOCK_SIZE})\n\
         \x20 total_bytes_to_send: total number of bytes to send (1GB or 500MB)"
    )
}

pub fn server_usage(progname: &str) -> String {
    format!(
        "Usage: {progname} <protocol> [mode] [<certificate> <private_key>]\n\
         \x20 protocol: tcp, udp or quic\n\
         \x20 mode (for udp/quic only): streaming (use: st) or stopandwait (use: sw)\n\
         \x20 certificate, private_key (quic only): PEM files (default: self-signed)"
    )
}

pub fn quic_server_usage(progname: &str) -> String {
    format!(
        "Usage: {progname} <mode> [<certificate> <private_key>]\n\
         \x20 mode: streaming (use: st) or stopandwait (use: sw) (default: streaming)\n\
         \x20 certificate, private_key: PEM files (default: self-signed)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    fn run<T>(cmd: Command<T>) -> T {
        match cmd {
            Command::Run(t) => t,
            Command::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_tcp_client() {
        let params = run(parse_client_args(&argv("client tcp 127.0.0.1 1024 500MB")).unwrap());
        assert_eq!(params.protocol, Protocol::Tcp);
        assert_eq!(params.mode, Mode::Streaming);
        assert_eq!(params.block_size, 1024);
        assert_eq!(params.total_bytes, 524_288_000);
    }

    #[test]
    fn test_udp_client_modes() {
        let params = run(parse_client_args(&argv("client udp sw 10.0.0.1 4096 1GB")).unwrap());
        assert_eq!(params.mode, Mode::StopAndWait);
        assert_eq!(params.server_ip, "10.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(params.total_bytes, 1_073_741_824);

        let params = run(parse_client_args(&argv("client UDP 10.0.0.1 4096 junk")).unwrap());
        assert_eq!(params.mode, Mode::Streaming);
        assert_eq!(params.total_bytes, 524_288_000);

        let params = run(parse_client_args(&argv("client quic sw ::1 10 1GB")).unwrap());
        assert_eq!(params.protocol, Protocol::Quic);
        assert_eq!(params.mode, Mode::StopAndWait);
    }

    #[test]
    fn test_client_rejects() {
        let err = parse_client_args(&argv("client sctp 1.2.3.4 10 1GB")).unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("Invalid protocol"));

        let err = parse_client_args(&argv("client udp xx 1.2.3.4 10 1GB")).unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("Invalid mode"));

        // tcp takes no mode
        assert!(parse_client_args(&argv("client tcp sw 1.2.3.4 10 1GB")).is_err());

        let err = parse_client_args(&argv("client tcp 1.2.3.4 0 1GB")).unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("Invalid block size"));
        let err = parse_client_args(&argv("client tcp 1.2.3.4 65537 1GB")).unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("Invalid block size"));
        assert!(parse_client_args(&argv("client tcp 1.2.3.4 65536 1GB")).is_ok());

        let err = parse_client_args(&argv("client tcp 1.2.3.4 big 1GB")).unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("Invalid block size or total bytes"));

        assert!(parse_client_args(&argv("client tcp 1.2.3.4")).is_err());
    }

    #[test]
    fn test_quic_client_variant() {
        let params = run(parse_quic_client_args(&argv("qc 127.0.0.1 1200 1GB")).unwrap());
        assert_eq!(params.mode, Mode::Streaming);
        assert_eq!(params.protocol, Protocol::Quic);

        let params = run(parse_quic_client_args(&argv("qc sw 127.0.0.1 1200 500MB")).unwrap());
        assert_eq!(params.mode, Mode::StopAndWait);

        assert!(parse_quic_client_args(&argv("qc xx 127.0.0.1 1200 1GB")).is_err());
        assert!(parse_quic_client_args(&argv("qc 127.0.0.1 1200")).is_err());
    }

    #[test]
    fn test_server_args() {
        let args = run(parse_server_args(&argv("server tcp")).unwrap());
        assert_eq!(args.protocol, Protocol::Tcp);
        assert!(parse_server_args(&argv("server tcp st")).is_err());

        let args = run(parse_server_args(&argv("server udp sw")).unwrap());
        assert_eq!(args.mode, Mode::StopAndWait);
        assert!(parse_server_args(&argv("server udp")).is_err());
        assert!(parse_server_args(&argv("server udp fast")).is_err());

        let args = run(parse_server_args(&argv("server quic st cert.pem key.pem")).unwrap());
        assert_eq!(
            args.tls_files,
            Some((PathBuf::from("cert.pem"), PathBuf::from("key.pem")))
        );
        assert!(parse_server_args(&argv("server quic st cert.pem")).is_err());
        assert!(parse_server_args(&argv("server")).is_err());
    }

    #[test]
    fn test_quic_server_variant() {
        let args = run(parse_quic_server_args(&argv("qs sw")).unwrap());
        assert_eq!(args.mode, Mode::StopAndWait);
        assert_eq!(args.tls_files, None);

        let args = run(parse_quic_server_args(&argv("qs c.pem k.pem")).unwrap());
        assert_eq!(args.mode, Mode::Streaming);
        assert!(args.tls_files.is_some());

        let args = run(parse_quic_server_args(&argv("qs sw c.pem k.pem")).unwrap());
        assert_eq!(args.mode, Mode::StopAndWait);

        assert!(parse_quic_server_args(&argv("qs")).is_err());
    }

    #[test]
    fn test_help() {
        assert_eq!(
            parse_client_args(&argv("client --help")).unwrap(),
            Command::Help
        );
        assert_eq!(parse_server_args(&argv("server -h")).unwrap(), Command::Help);
        assert!(client_usage("client").contains("1 to 65536"));
    }
}
