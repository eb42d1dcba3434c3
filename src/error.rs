//! Error types for telswitch.

use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

/// Main error type for telswitch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Address arithmetic or host network stack errors
    #[error("Network error: {0}")]
    Net(#[from] NetError),

    /// Telnet session errors (connection, handshake)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Command sequence errors
    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    /// Scan orchestration errors
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

/// Address and interface errors, raised before any network activity.
#[derive(Error, Debug)]
pub enum NetError {
    /// Input was not a dotted quad of four octets 0-255
    #[error("Invalid IPv4 address or mask: '{input}'")]
    InvalidAddress { input: String },

    /// No usable LAN interface on the host
    #[error("No up, broadcast-capable IPv4 interface found")]
    NoInterface,
}

/// Telnet session errors (connection and login handshake).
#[derive(Error, Debug)]
pub enum SessionError {
    /// The host never sent a single byte: it is down, unroutable, or not
    /// speaking this protocol. Permanent for this scan, never retried.
    #[error("Host {host} unreachable on the Telnet port")]
    Unreachable { host: Ipv4Addr },

    /// The host sent data but no recognizable prompt within the handshake
    /// window, across every allowed attempt.
    #[error("Login handshake with {host} failed after {attempts} attempt(s)")]
    HandshakeFailed { host: Ipv4Addr, attempts: u32 },

    /// The session was closed (locally or by the peer) before the
    /// operation finished.
    #[error("Session closed")]
    Closed,

    /// I/O error on the underlying socket
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Command sequence errors.
#[derive(Error, Debug)]
pub enum SequenceError {
    /// The session stopped responding entirely: the whole-sequence watchdog
    /// fired before the command list drained.
    #[error("Sequence watchdog expired after {budget:?}")]
    WatchdogExpired { budget: Duration },

    /// Session failure partway through the sequence
    #[error("Session failed mid-sequence: {0}")]
    Session(#[from] SessionError),
}

/// Scan orchestration errors.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Another scan holds the process-wide lock. Rejected before any I/O.
    #[error("A scan is already in progress")]
    ScanInProgress,
}

/// Result type alias using telswitch's Error.
pub type Result<T> = std::result::Result<T, Error>;
