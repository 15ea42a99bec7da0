// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page worker: one raw capture in, one or two named target-page images
// out. Every step is an external tool call; any failure fails the worker
// and, once joined, the whole run.

use std::sync::Arc;

use tracing::{debug, instrument};

use scanwerk_core::config::ScanJob;
use scanwerk_core::error::Result;
use scanwerk_core::layout::Prerotation;
use scanwerk_core::plan::PagePlan;

use crate::tools::{CleanupRequest, ToolChain};
use crate::workdir::WorkDir;

/// Process one raw capture into its target page image(s).
///
/// Steps: optional whole-image rotation, cleanup/deskew (which splits
/// two-sided captures), then rasterisation of each side under its
/// resolved target index. The raw file is deleted on success — each
/// capture is consumed exactly once.
#[instrument(skip_all, fields(raw = %page.raw))]
pub async fn process_page(
    job: Arc<ScanJob>,
    page: PagePlan,
    tools: Arc<dyn ToolChain>,
    work: Arc<WorkDir>,
    reduced_quality: bool,
) -> Result<()> {
    let raw_path = work.raw_page(page.raw);

    let input = if job.rotate_degrees != 0 {
        let rotated = work.rotated_page(page.raw);
        tools.rotate(&raw_path, &rotated, job.rotate_degrees).await?;
        rotated
    } else {
        raw_path.clone()
    };

    // Both sides of a capture share one prerotation; it comes from the
    // folded-sheet parity, not from the side.
    let prerotate = page
        .placements
        .first()
        .map(|pl| pl.prerotate)
        .unwrap_or(Prerotation::None);

    tools
        .clean(CleanupRequest {
            input: &input,
            output_stem: &work.cleaned_stem(page.raw),
            dpi: job.resolution_dpi,
            layout: job.layout,
            geometry: job.geometry,
            mode: job.mode,
            prerotate,
            reduced_quality,
        })
        .await?;

    for (side, placement) in page.placements.iter().enumerate() {
        let side_path = work.cleaned_side(page.raw, side as u32 + 1);
        let target_path = work.target_page(placement.target);
        tools
            .rasterize(&side_path, &target_path, job.resolution_dpi)
            .await?;
        debug!(target = %placement.target, "target page written");
    }

    tokio::fs::remove_file(&raw_path).await?;
    if input != raw_path {
        tokio::fs::remove_file(&input).await?;
    }

    Ok(())
}
