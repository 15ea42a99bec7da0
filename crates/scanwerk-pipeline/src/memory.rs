// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Memory admission control.
//
// Worker concurrency is gated by live free-memory pressure instead of a
// fixed pool size. The probe is an injected capability so tests never
// depend on the real host's memory state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysinfo::System;
use tracing::{debug, info, warn};

use scanwerk_core::error::{Result, ScanwerkError};

/// Free-memory percentage below which the pipeline throttles admissions.
pub const FREE_RATIO_THRESHOLD: f64 = 30.0;

/// Interval between free-ratio samples while waiting for headroom.
pub const ADMISSION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Hosts with less total memory than this (KiB, as reported by the host)
/// run the cleanup tool with its expensive deskew sub-stage disabled.
pub const LOW_TOTAL_MEMORY_KIB: u64 = 512_000;

/// Capability to sample the host's memory state.
pub trait MemoryProbe: Send + Sync {
    /// Percentage of free/cacheable memory relative to total, in [0, 100].
    fn free_ratio(&self) -> Result<f64>;

    /// Total system memory in KiB.
    fn total_kib(&self) -> Result<u64>;
}

/// Production probe backed by `sysinfo`.
pub struct SystemMemoryProbe {
    system: Mutex<System>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn free_ratio(&self) -> Result<f64> {
        let mut sys = self
            .system
            .lock()
            .map_err(|_| ScanwerkError::Memory("probe mutex poisoned".into()))?;
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(ScanwerkError::Memory("host reports zero total memory".into()));
        }
        // Available includes reclaimable cache, matching what the kernel
        // would actually hand out to a new worker.
        Ok(sys.available_memory() as f64 / total as f64 * 100.0)
    }

    fn total_kib(&self) -> Result<u64> {
        let mut sys = self
            .system
            .lock()
            .map_err(|_| ScanwerkError::Memory("probe mutex poisoned".into()))?;
        sys.refresh_memory();
        Ok(sys.total_memory() / 1024)
    }
}

/// Gates how many concurrent workers may run, based on memory pressure.
///
/// Owned exclusively by the scheduler; workers never touch it.
pub struct AdmissionController {
    probe: Arc<dyn MemoryProbe>,
    started_constrained: bool,
    reduced_quality: bool,
    poll_interval: Duration,
}

impl AdmissionController {
    /// Sample the host once and latch the startup decisions.
    ///
    /// The constrained flag never changes for the lifetime of the
    /// pipeline, even if memory later recovers — workers already chosen
    /// for sequential execution stay sequential.
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Result<Self> {
        let ratio = probe.free_ratio()?;
        let total_kib = probe.total_kib()?;

        let started_constrained = ratio < FREE_RATIO_THRESHOLD;
        let reduced_quality = total_kib < LOW_TOTAL_MEMORY_KIB;

        if started_constrained {
            warn!(
                free_pct = format!("{ratio:.1}"),
                "memory already tight at startup — workers will run one at a time"
            );
        } else {
            info!(free_pct = format!("{ratio:.1}"), "memory headroom ok");
        }
        if reduced_quality {
            warn!(
                total_kib,
                "small host — disabling the expensive deskew sub-stage"
            );
        }

        Ok(Self {
            probe,
            started_constrained,
            reduced_quality,
            poll_interval: ADMISSION_POLL_INTERVAL,
        })
    }

    /// True when the pipeline started with free memory below threshold.
    pub fn started_constrained(&self) -> bool {
        self.started_constrained
    }

    /// True when the cleanup tool should skip its expensive sub-stage.
    pub fn reduced_quality(&self) -> bool {
        self.reduced_quality
    }

    /// Block until the free ratio is back above threshold.
    ///
    /// Called between fire-and-forget launches in unconstrained mode.
    /// Samples immediately, then on a fixed interval; this is a soft
    /// gate — already-running workers are unaffected.
    pub async fn wait_for_headroom(&self) -> Result<()> {
        loop {
            let ratio = self.probe.free_ratio()?;
            if ratio > FREE_RATIO_THRESHOLD {
                return Ok(());
            }
            debug!(
                free_pct = format!("{ratio:.1}"),
                "memory below threshold — delaying next admission"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Probe returning a scripted sequence of free ratios (repeats the
    /// final value once exhausted).
    pub(crate) struct ScriptedProbe {
        ratios: Vec<f64>,
        calls: AtomicUsize,
        total_kib: u64,
    }

    impl ScriptedProbe {
        pub(crate) fn new(ratios: Vec<f64>, total_kib: u64) -> Self {
            Self {
                ratios,
                calls: AtomicUsize::new(0),
                total_kib,
            }
        }

        fn samples_taken(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MemoryProbe for ScriptedProbe {
        fn free_ratio(&self) -> Result<f64> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(*self.ratios.get(i).or(self.ratios.last()).unwrap_or(&100.0))
        }

        fn total_kib(&self) -> Result<u64> {
            Ok(self.total_kib)
        }
    }

    #[test]
    fn constrained_flag_latches_at_startup() {
        // Starts below threshold, recovers immediately afterwards — the
        // latched flag must not change.
        let probe = Arc::new(ScriptedProbe::new(vec![10.0, 90.0], 8_000_000));
        let ctl = AdmissionController::new(probe).unwrap();
        assert!(ctl.started_constrained());
    }

    #[test]
    fn ample_memory_is_not_constrained() {
        let probe = Arc::new(ScriptedProbe::new(vec![75.0], 8_000_000));
        let ctl = AdmissionController::new(probe).unwrap();
        assert!(!ctl.started_constrained());
        assert!(!ctl.reduced_quality());
    }

    #[test]
    fn small_hosts_get_reduced_quality() {
        let probe = Arc::new(ScriptedProbe::new(vec![80.0], 256_000));
        let ctl = AdmissionController::new(probe).unwrap();
        assert!(ctl.reduced_quality());
    }

    #[tokio::test(start_paused = true)]
    async fn headroom_wait_polls_until_ratio_recovers() {
        // Startup sample (80), then three below-threshold samples before
        // recovery: expect exactly two poll-interval sleeps.
        let probe = Arc::new(ScriptedProbe::new(
            vec![80.0, 20.0, 25.0, 31.0],
            8_000_000,
        ));
        let ctl = AdmissionController::new(probe.clone()).unwrap();

        let before = tokio::time::Instant::now();
        ctl.wait_for_headroom().await.unwrap();
        let waited = before.elapsed();

        assert_eq!(waited, ADMISSION_POLL_INTERVAL * 2);
        assert_eq!(probe.samples_taken(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn headroom_wait_returns_immediately_with_free_memory() {
        let probe = Arc::new(ScriptedProbe::new(vec![80.0, 85.0], 8_000_000));
        let ctl = AdmissionController::new(probe).unwrap();

        let before = tokio::time::Instant::now();
        ctl.wait_for_headroom().await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
