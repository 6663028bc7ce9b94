//! Fixed-period, single-threaded frame loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::capture::{CaptureConstraints, CaptureDevice, DeviceError, DeviceGuard};
use crate::render::Snapshots;
use crate::session::{Phase, SessionController, TickOutcome};
use crate::ScanConfig;

/// Cooperative stop signal shared with whoever may cancel the scan.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why [`ScanLoop::run`] returned.
#[derive(Debug)]
pub enum ScanExit {
    Completed(Box<Snapshots>),
    Cancelled,
    /// The session was not scanning when the loop started.
    Idle,
}

/// Drives a [`SessionController`] from a [`CaptureDevice`] at a fixed period.
///
/// Ticks never overlap: a tick runs to completion, then the loop sleeps until
/// the next deadline. When a tick overruns, the missed deadlines are dropped
/// instead of being replayed back to back.
#[derive(Clone, Debug)]
pub struct ScanLoop {
    interval: Duration,
}

impl Default for ScanLoop {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl ScanLoop {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.tick_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Scan until every question confirms, the token is cancelled or the
    /// device fails. The device is released before this returns.
    pub fn run<D: CaptureDevice + ?Sized>(
        &self,
        session: &mut SessionController,
        device: &mut D,
        constraints: &CaptureConstraints,
        cancel: &CancelToken,
    ) -> Result<ScanExit, DeviceError> {
        if session.phase() != Phase::Scanning {
            return Ok(ScanExit::Idle);
        }
        let mut guard = DeviceGuard::acquire(device, constraints)?;
        let mut deadline = Instant::now();

        loop {
            if cancel.is_cancelled() {
                info!("scan cancelled after {} frames", session.frames_seen());
                return Ok(ScanExit::Cancelled);
            }

            let frame = guard.grab().inspect_err(|err| warn!("capture failed: {err}"))?;
            if let TickOutcome::Completed(snapshots) = session.tick(&frame.view()) {
                return Ok(ScanExit::Completed(snapshots));
            }

            deadline += self.interval;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }
    }
}
