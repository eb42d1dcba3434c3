//! # Telswitch
//!
//! Async Telnet LAN scanner and fleet reconfiguration library for
//! embedded screens.
//!
//! Telswitch finds, on the local IPv4 subnet, the screens that accept
//! interactive Telnet login under the fleet credential pair, and drives
//! them through a scripted cloud-endpoint switch (rewrite the broker
//! config, restart the client service, verify from the device's own log
//! that the change took effect), entirely over the raw Telnet session.
//!
//! ## Features
//!
//! - Single-flight subnet scan with batching, pacing and cooperative
//!   cancellation
//! - Prompt-driven login state machine over raw TCP, with the
//!   permanent/transient failure split and bounded retry
//! - Ordered command sequencing with per-command timeouts and a
//!   whole-sequence watchdog
//! - Two-stage verified endpoint switch between the overseas and
//!   mainland-China profiles
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use telswitch::{scan, switch_version, ScanOptions, VersionKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), telswitch::Error> {
//!     let ip = telswitch::net::iface::local_address()?;
//!     let mask = telswitch::net::iface::subnet_mask()?;
//!
//!     let report = scan(&ip.to_string(), &mask.to_string(), ScanOptions::default()).await?;
//!     for device in &report.devices {
//!         println!("{} ({})", device.ip, device.device_id.as_deref().unwrap_or("unknown"));
//!     }
//!
//!     if let Some(device) = report.devices.first() {
//!         let outcome = switch_version(device.ip, VersionKind::Overseas).await;
//!         println!("{}", outcome.message);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod net;
pub mod scan;
pub mod sequence;
pub mod session;
pub mod switch;
pub mod transport;

// Re-export main types for convenience
pub use error::Error;
pub use net::AddressRange;
pub use scan::{scan, stop_scan, CancelToken, Device, Progress, ScanOptions, ScanReport};
pub use sequence::{CommandResult, CommandSequencer, CommandSpec};
pub use session::TelnetSession;
pub use switch::{
    switch_version, switch_version_with, SwitchOptions, SwitchOutcome, VersionKind, VersionProfile,
};
pub use transport::{Credentials, TelnetConfig};
