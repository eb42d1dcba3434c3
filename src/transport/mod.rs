//! Raw TCP transport for the Telnet service port.
//!
//! This module provides the low-level connection management: dialing the
//! fixed service port with a deadline and writing CRLF-terminated lines.

pub mod config;
mod tcp;

pub use config::{Credentials, TelnetConfig};
pub use tcp::TelnetStream;
