//! Process-wide single-flight scan lock and cooperative cancellation.
//!
//! At most one scan runs per process. The lock is an atomic acquired by
//! compare-and-swap before any work begins, and released by the guard's
//! `Drop` so every exit path unlocks, including unwinding. A crash
//! mid-scan must never leave the process locked out of scanning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::info;

use crate::error::ScanError;

static SCAN_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Cancel token of the scan currently holding the lock, if any. This is
/// what [`stop_scan`] reaches for.
static ACTIVE_CANCEL: Mutex<Option<CancelToken>> = Mutex::new(None);

/// Cooperative cancellation flag, cheap to clone and share.
///
/// Checked at batch and per-address granularity only; an in-flight
/// handshake always runs to its own completion or timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// RAII holder of the process-wide scan lock.
pub(crate) struct ScanGuard(());

impl ScanGuard {
    /// Take the lock, registering `cancel` as the active scan's token.
    ///
    /// Fails with [`ScanError::ScanInProgress`] without side effects if
    /// another scan holds the lock.
    pub fn acquire(cancel: CancelToken) -> Result<Self, ScanError> {
        SCAN_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScanError::ScanInProgress)?;
        *ACTIVE_CANCEL.lock().unwrap() = Some(cancel);
        Ok(Self(()))
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = ACTIVE_CANCEL.lock() {
            active.take();
        }
        SCAN_ACTIVE.store(false, Ordering::Release);
    }
}

/// Cancel the active scan, if one is running.
///
/// Returns `true` when a scan was active and has been signalled; it will
/// stop at its next batch or address boundary and release the lock on the
/// way out.
pub fn stop_scan() -> bool {
    match ACTIVE_CANCEL.lock().unwrap().as_ref() {
        Some(token) => {
            info!("stop requested for the active scan");
            token.cancel();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The lock under test is process-global, so the tests themselves must
    // not run concurrently.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn second_acquire_fails_until_guard_drops() {
        let _serial = TEST_LOCK.lock().unwrap();
        let guard = ScanGuard::acquire(CancelToken::new()).unwrap();
        assert!(matches!(
            ScanGuard::acquire(CancelToken::new()),
            Err(ScanError::ScanInProgress)
        ));
        drop(guard);
        let reacquired = ScanGuard::acquire(CancelToken::new());
        assert!(reacquired.is_ok());
    }

    #[test]
    fn stop_scan_reaches_the_registered_token() {
        let _serial = TEST_LOCK.lock().unwrap();
        assert!(!stop_scan());

        let token = CancelToken::new();
        let guard = ScanGuard::acquire(token.clone()).unwrap();
        assert!(stop_scan());
        assert!(token.is_cancelled());
        drop(guard);

        assert!(!stop_scan());
    }

    #[test]
    fn panic_while_holding_the_guard_releases_the_lock() {
        let _serial = TEST_LOCK.lock().unwrap();
        let result = std::panic::catch_unwind(|| {
            let _guard = ScanGuard::acquire(CancelToken::new()).unwrap();
            panic!("scan body blew up");
        });
        assert!(result.is_err());
        let guard = ScanGuard::acquire(CancelToken::new());
        assert!(guard.is_ok());
    }
}
