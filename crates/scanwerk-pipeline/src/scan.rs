// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan acquisition: drive the scanner CLI with the batch numbering
// scheme each duplex strategy needs, and report which captures actually
// arrived on disk.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use scanwerk_core::config::ScanJob;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{DuplexMode, RawPageId};

use crate::workdir::WorkDir;

/// Numbering for one scanner invocation: capture files are named
/// `start`, `start + increment`, ... for `count` captures (unbounded
/// when `count` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchNumbering {
    pub start: u32,
    pub increment: i32,
    pub count: Option<u32>,
}

/// The scanner collaborator.
#[async_trait]
pub trait ScanSource: Send + Sync {
    /// Produce the raw captures for the whole batch and return their
    /// indices, ascending.
    async fn acquire(&self, job: &ScanJob, work: &WorkDir) -> Result<Vec<RawPageId>>;
}

/// Callback fired between manual-duplex passes so the user can flip the
/// stack. Injected by the CLI; tests substitute a no-op.
pub type TurnStack = Box<dyn Fn() -> std::io::Result<()> + Send + Sync>;

/// SANE-style scanner frontend (`scanimage`-compatible batch options).
pub struct SaneScanSource {
    command: String,
    turn_stack: Option<TurnStack>,
}

impl SaneScanSource {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            turn_stack: None,
        }
    }

    /// Install the flip-the-stack prompt used for manual duplex.
    pub fn with_turn_stack(mut self, turn_stack: TurnStack) -> Self {
        self.turn_stack = Some(turn_stack);
        self
    }

    /// One scanner invocation with explicit batch numbering.
    async fn run_pass(
        &self,
        job: &ScanJob,
        work: &WorkDir,
        numbering: BatchNumbering,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-d")
            .arg(&job.device)
            .arg("--resolution")
            .arg(job.resolution_dpi.to_string())
            .arg("--mode")
            .arg(job.mode.backend_name())
            .arg("-x")
            .arg(job.geometry.width_mm.to_string())
            .arg("-y")
            .arg(job.geometry.height_mm.to_string());

        let left = if job.center_offset {
            // Centre on the glass when the device maximum is known.
            match &job.max_scan_area {
                Some(max) => (max.width_mm - job.geometry.width_mm) / 2.0,
                None => job.geometry.x_offset_mm,
            }
        } else {
            job.geometry.x_offset_mm
        };
        let top = job.geometry.y_offset_mm + job.vertical_offset_mm.unwrap_or(0.0);
        cmd.arg("-l").arg(left.to_string());
        cmd.arg("-t").arg(top.to_string());

        if job.duplex == DuplexMode::Adf {
            cmd.arg("--source").arg("ADF Duplex");
        }
        if job.remove_blanks {
            // Let the backend drop blank captures; the plan step copes
            // with the resulting gaps.
            cmd.arg("--swskip").arg("3%");
        }

        cmd.arg(format!("--batch={}", work.raw_pattern().display()))
            .arg("--batch-start")
            .arg(numbering.start.to_string())
            .arg("--batch-increment")
            .arg(numbering.increment.to_string());
        if let Some(count) = numbering.count {
            cmd.arg("--batch-count").arg(count.to_string());
        }

        debug!(start = numbering.start, increment = numbering.increment, count = ?numbering.count, "scanner pass");
        cmd.stdin(Stdio::null());
        let output = cmd
            .output()
            .await
            .map_err(|e| ScanwerkError::Scan(format!("failed to launch {}: {e}", self.command)))?;

        if !output.status.success() {
            // In unbounded mode the scanner signals "feeder empty" with a
            // failed final capture; that is how the run ends, not an error.
            if job.expected_captures().is_none() && numbering.count.is_none() {
                debug!(status = %output.status, "scanner stopped — feeder empty");
                return Ok(());
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "scanner failed");
            return Err(ScanwerkError::Scan(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ScanSource for SaneScanSource {
    #[instrument(skip_all, fields(device = %job.device, duplex = ?job.duplex))]
    async fn acquire(&self, job: &ScanJob, work: &WorkDir) -> Result<Vec<RawPageId>> {
        match job.duplex {
            DuplexMode::None | DuplexMode::Adf => {
                let numbering = BatchNumbering {
                    start: 1,
                    increment: 1,
                    count: job.expected_captures(),
                };
                self.run_pass(job, work, numbering).await?;
            }
            DuplexMode::Manual => {
                // Validation guarantees bounded, even counts here.
                let total = job.expected_captures().ok_or_else(|| {
                    ScanwerkError::Scan("manual duplex requires bounded counts".into())
                })?;
                let (front, back) = manual_duplex_numbering(total);

                self.run_pass(job, work, front).await?;

                let turn = self.turn_stack.as_ref().ok_or_else(|| {
                    ScanwerkError::Scan(
                        "manual duplex needs an interactive prompt to flip the stack".into(),
                    )
                })?;
                turn().map_err(|e| ScanwerkError::Scan(format!("stack-flip prompt: {e}")))?;

                self.run_pass(job, work, back).await?;
            }
        }

        let pages = work.list_raw_pages()?;
        info!(captures = pages.len(), "scan acquisition finished");
        Ok(pages)
    }
}

/// Batch numbering for the two manual-duplex passes.
///
/// Odd sides are captured ascending; after the flip the stack comes back
/// reversed, so even sides are captured descending from the last page.
pub fn manual_duplex_numbering(total: u32) -> (BatchNumbering, BatchNumbering) {
    debug_assert!(total % 2 == 0, "manual duplex needs an even capture count");
    let half = total / 2;
    (
        BatchNumbering {
            start: 1,
            increment: 2,
            count: Some(half),
        },
        BatchNumbering {
            start: total,
            increment: -2,
            count: Some(half),
        },
    )
}
