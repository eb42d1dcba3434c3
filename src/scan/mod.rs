//! Subnet scan orchestration.
//!
//! The scan walks the host range in ascending order, one Telnet attempt
//! at a time. That is deliberate: parallel probing saturates the
//! constrained Wi-Fi radios on the managed screens and produces false
//! negatives, so throughput is traded for reliability. Pacing between
//! batches and between addresses is part of the same backpressure policy.

mod device;
mod lock;

pub use device::{Device, DEVICE_TYPE};
pub use lock::{stop_scan, CancelToken};

use std::net::Ipv4Addr;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;

use crate::error::Result;
use crate::net::AddressRange;
use crate::scan::device::DeviceSet;
use crate::scan::lock::ScanGuard;
use crate::session::TelnetSession;
use crate::transport::{Credentials, TelnetConfig};

/// Progress report delivered after every probed address.
///
/// `devices` is a deep copy; the callback may keep or mutate it freely
/// without aliasing scan-internal state.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    /// `floor(scanned / total * 100)`.
    pub percent: u8,

    /// Addresses probed so far, successes and failures alike.
    pub scanned: usize,

    /// Total addresses in the range.
    pub total: usize,

    /// Snapshot of the devices discovered so far, in discovery order.
    pub devices: Vec<Device>,
}

/// Progress callback. Invoked inline from the scan loop, so it should
/// return promptly.
pub type ProgressFn = Box<dyn FnMut(Progress) + Send>;

/// Scan behavior flags.
///
/// The defaults reproduce the pacing the fleet was tuned for; tests and
/// unusual deployments can dial them.
pub struct ScanOptions {
    /// Service port to probe (default: 23).
    pub port: u16,

    /// Addresses per batch.
    pub batch_size: usize,

    /// Handshake budget per address.
    pub attempt_timeout: Duration,

    /// Pause between batches, letting OS socket resources recover.
    pub batch_pause: Duration,

    /// Pause between addresses within a batch.
    pub address_pause: Duration,

    /// Pause before returning, covering teardown of the last sockets.
    pub settle_pause: Duration,

    /// Handshake retry bound passed through to the session layer.
    pub login_retries: u32,

    /// Credential pair to present to every address.
    pub credentials: Credentials,

    /// Cooperative cancellation; [`stop_scan`] cancels the same token.
    pub cancel: CancelToken,

    /// Optional progress callback.
    pub progress: Option<ProgressFn>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            port: 23,
            batch_size: 50,
            attempt_timeout: Duration::from_millis(700),
            batch_pause: Duration::from_millis(300),
            address_pause: Duration::from_millis(50),
            settle_pause: Duration::from_millis(500),
            login_retries: 3,
            credentials: Credentials::default(),
            cancel: CancelToken::new(),
            progress: None,
        }
    }
}

impl std::fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOptions")
            .field("port", &self.port)
            .field("batch_size", &self.batch_size)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("batch_pause", &self.batch_pause)
            .field("address_pause", &self.address_pause)
            .field("settle_pause", &self.settle_pause)
            .field("login_retries", &self.login_retries)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Devices that accepted the credential pair. No two entries share
    /// an ip.
    pub devices: Vec<Device>,

    /// Whether the scan stopped early on a cancellation request.
    pub aborted: bool,
}

/// Scan the subnet of `ip`/`mask` for devices accepting Telnet login.
///
/// At most one scan may be active per process; a second call fails with
/// `ScanError::ScanInProgress` before attempting any I/O and without
/// perturbing the running scan. The lock is released on every exit path.
///
/// A single address failing (unreachable, refusing the credentials,
/// timing out) never aborts the scan; it is logged and the walk moves
/// on.
pub async fn scan(ip: &str, mask: &str, mut options: ScanOptions) -> Result<ScanReport> {
    // Lock first: contention must be rejected before any other work.
    let _guard = ScanGuard::acquire(options.cancel.clone())?;

    let range = AddressRange::compute(ip, mask)?;
    info!(
        "scanning {} host(s) in {}..{}",
        range.host_count.max(0),
        range.first_host,
        range.last_host
    );

    let report = walk_range(&range, &mut options).await;
    Ok(report)
}

async fn walk_range(range: &AddressRange, options: &mut ScanOptions) -> ScanReport {
    // Target subnets are /16 at worst, so materializing keeps the batch
    // bookkeeping simple.
    let hosts: Vec<Ipv4Addr> = range.hosts().collect();
    let total = hosts.len();
    let telnet_config = TelnetConfig::default()
        .with_port(options.port)
        .with_timeout(options.attempt_timeout)
        .with_retries(options.login_retries);

    let mut devices = DeviceSet::default();
    let mut scanned = 0usize;
    let mut aborted = false;

    'batches: for (batch_index, batch) in hosts.chunks(options.batch_size.max(1)).enumerate() {
        if options.cancel.is_cancelled() {
            aborted = true;
            break;
        }
        if batch_index > 0 {
            tokio::time::sleep(options.batch_pause).await;
        }
        debug!("batch {} ({} address(es))", batch_index + 1, batch.len());

        for (i, &addr) in batch.iter().enumerate() {
            if options.cancel.is_cancelled() {
                aborted = true;
                break 'batches;
            }
            if i > 0 {
                tokio::time::sleep(options.address_pause).await;
            }

            match TelnetSession::login(addr, &options.credentials, telnet_config.clone()).await {
                Ok(mut session) => {
                    let device_id = session.identify().await;
                    session.close().await;
                    info!(
                        "device at {addr} accepted login, id {}",
                        device_id.as_deref().unwrap_or("unknown")
                    );
                    devices.upsert(Device::discovered(addr, device_id));
                }
                Err(e) => debug!("{addr}: {e}"),
            }

            scanned += 1;
            if let Some(progress) = options.progress.as_mut() {
                progress(Progress {
                    percent: (scanned * 100 / total) as u8,
                    scanned,
                    total,
                    devices: devices.snapshot(),
                });
            }
        }
    }

    // Let the last teardown drain before handing control back.
    tokio::time::sleep(options.settle_pause).await;

    if aborted {
        info!("scan aborted with {} device(s) found", devices.len());
    } else {
        info!("scan complete, {} device(s) found", devices.len());
    }

    ScanReport {
        devices: devices.into_vec(),
        aborted,
    }
}
