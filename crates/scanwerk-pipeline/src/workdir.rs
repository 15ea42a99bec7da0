// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-run isolated working directory and the canonical file naming that
// ties raw captures, cleaned sides, target pages, and document artifacts
// together. Removed recursively on drop, on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use scanwerk_core::error::Result;
use scanwerk_core::types::{RawPageId, TargetPageId};

/// Isolated scratch directory for one pipeline run.
///
/// Workers only ever write inside this directory; the final encode step
/// is the single operation that touches the real output path.
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create a fresh working directory under the system temp location.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("scanwerk-{}-", Uuid::new_v4().simple()))
            .tempdir()?;
        debug!(path = %dir.path().display(), "working directory created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Pattern handed to the scan backend (`%03d` expands per capture).
    pub fn raw_pattern(&self) -> PathBuf {
        self.dir.path().join("raw-%03d.pnm")
    }

    /// File produced by the scan backend for one capture.
    pub fn raw_page(&self, raw: RawPageId) -> PathBuf {
        self.dir.path().join(format!("raw-{:03}.pnm", raw.0))
    }

    /// Output of the whole-image rotation step.
    pub fn rotated_page(&self, raw: RawPageId) -> PathBuf {
        self.dir.path().join(format!("raw-{:03}-rot.pnm", raw.0))
    }

    /// Stem the cleanup tool appends `-1`/`-2` to for its side outputs.
    pub fn cleaned_stem(&self, raw: RawPageId) -> PathBuf {
        self.dir.path().join(format!("clean-{:03}", raw.0))
    }

    /// Side image emitted by the cleanup tool (`side` is 1 or 2).
    pub fn cleaned_side(&self, raw: RawPageId, side: u32) -> PathBuf {
        self.dir
            .path()
            .join(format!("clean-{:03}-{side}.pnm", raw.0))
    }

    /// Intermediate page image, named by its resolved target index.
    pub fn target_page(&self, target: TargetPageId) -> PathBuf {
        self.dir.path().join(format!("page-{:04}.tif", target.0))
    }

    /// Multi-page intermediate artifact for one document (0-based index).
    pub fn document_artifact(&self, document: u32) -> PathBuf {
        self.dir.path().join(format!("doc-{:03}.tif", document + 1))
    }

    /// Enumerate the raw captures the scan backend actually produced,
    /// ascending. Gaps are expected when blank removal is on.
    pub fn list_raw_pages(&self) -> Result<Vec<RawPageId>> {
        let mut pages = Vec::new();
        for entry in std::fs::read_dir(self.dir.path())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(idx) = parse_raw_name(name) {
                pages.push(RawPageId(idx));
            }
        }
        pages.sort_unstable();
        Ok(pages)
    }
}

/// `raw-007.pnm` → `Some(7)`; rotated/cleaned files don't match.
/// Batches past 999 pages widen the field, so 3 digits is a minimum.
fn parse_raw_name(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("raw-")?;
    let digits = rest.strip_suffix(".pnm")?;
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
