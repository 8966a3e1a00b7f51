//! Transfer counters and the run summary

use std::fmt;
use std::time::{Duration, Instant};

use crate::session::{Mode, Protocol};

/// Which side produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Running counters for one session
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// Set on the first recorded activity or by [`TransferStats::start`]
    start_time: Option<Instant>,

    /// Bytes sent or received
    pub total_bytes: u64,

    /// Writes (client) or reads/datagrams (server)
    pub total_messages: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            start_time: None,
            total_bytes: 0,
            total_messages: 0,
        }
    }

    /// Start the clock now (no-op if already running)
    pub fn start(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }

    /// Count one message of `len` bytes
    pub fn record(&mut self, len: usize) {
        self.start();
        self.total_bytes += len as u64;
        self.total_messages += 1;
    }

    /// Time since the clock started
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Freeze the counters into a report
    pub fn finish(&self, role: Role, protocol: Protocol, mode: Mode) -> TransferReport {
        TransferReport {
            role,
            protocol,
            mode,
            elapsed: self.elapsed(),
            total_messages: self.total_messages,
            total_bytes: self.total_bytes,
        }
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Final numbers of one run
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub role: Role,
    pub protocol: Protocol,
    pub mode: Mode,
    pub elapsed: Duration,
    pub total_messages: u64,
    pub total_bytes: u64,
}

impl TransferReport {
    /// Throughput (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / secs
    }

    /// One-line log form
    pub fn log_line(&self) -> String {
        format!(
            "{} {} | Time: {:.2}s | Messages: {} | Bytes: {} | Throughput: {:.2} MB/s",
            self.protocol,
            self.mode.label(self.protocol),
            self.elapsed.as_secs_f64(),
            self.total_messages,
            self.total_bytes,
            self.throughput() / 1_000_000.0,
        )
    }
}

/// Summary printed on stdout; tooling parses these exact lines
impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Protocol used: {}", self.protocol)?;
        writeln!(f, "Mode used: {}", self.mode.label(self.protocol))?;
        match self.role {
            Role::Client => {
                writeln!(
                    f,
                    "Total transmission time: {:.6} seconds",
                    self.elapsed.as_secs_f64()
                )?;
                writeln!(f, "Total number of messages sent: {}", self.total_messages)?;
                write!(f, "Total number of bytes sent: {}", self.total_bytes)
            }
            Role::Server => {
                writeln!(
                    f,
                    "Total reception time: {:.6} seconds",
                    self.elapsed.as_secs_f64()
                )?;
                writeln!(f, "Total messages received: {}", self.total_messages)?;
                write!(f, "Total bytes received: {}", self.total_bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(role: Role, protocol: Protocol, mode: Mode) -> TransferReport {
        TransferReport {
            role,
            protocol,
            mode,
            elapsed: Duration::from_micros(1_500_250),
            total_messages: 262_144,
            total_bytes: 1_073_741_824,
        }
    }

    #[test]
    fn test_client_summary_shape() {
        let text = report(Role::Client, Protocol::Udp, Mode::StopAndWait).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Protocol used: UDP",
                "Mode used: Stop and Wait",
                "Total transmission time: 1.500250 seconds",
                "Total number of messages sent: 262144",
                "Total number of bytes sent: 1073741824",
            ]
        );
    }

    #[test]
    fn test_server_summary_shape() {
        let text = report(Role::Server, Protocol::Tcp, Mode::Streaming).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Protocol used: TCP");
        assert_eq!(lines[1], "Mode used: Streaming (default)");
        assert_eq!(lines[2], "Total reception time: 1.500250 seconds");
        assert_eq!(lines[3], "Total messages received: 262144");
        assert_eq!(lines[4], "Total bytes received: 1073741824");
    }

    #[test]
    fn test_record() {
        let mut stats = TransferStats::new();
        assert_eq!(stats.elapsed(), Duration::ZERO);
        stats.record(100);
        stats.record(28);
        assert_eq!(stats.total_bytes, 128);
        assert_eq!(stats.total_messages, 2);

        let report = stats.finish(Role::Server, Protocol::Quic, Mode::Streaming);
        assert_eq!(report.total_bytes, 128);
        assert!(report.log_line().starts_with("QUIC Streaming |"));
    }
}
