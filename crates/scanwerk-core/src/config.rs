// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job configuration: an immutable settings value merged once from layered
// sources (CLI > per-device config > global config > built-in default)
// and validated before any external process runs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScanwerkError};
use crate::types::{Count, DuplexMode, Geometry, Layout, OutputTarget, ScanMode};

/// One layer of job settings, every field optional.
///
/// Layers come from the CLI, the per-device config table, and the global
/// config table. `merged_over` folds them with explicit precedence; the
/// missing pieces fall back to built-in defaults in [`ScanJob::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobOverlay {
    pub device: Option<String>,
    pub resolution: Option<u32>,
    pub mode: Option<ScanMode>,
    pub geometry: Option<Geometry>,
    pub layout: Option<Layout>,
    pub duplex: Option<DuplexMode>,
    pub rotate: Option<u16>,
    pub pages: Option<Count>,
    pub documents: Option<Count>,
    pub center_offset: Option<bool>,
    pub vertical_offset_mm: Option<f64>,
    pub remove_blanks: Option<bool>,
    /// Device capability limit, normally set in the per-device table.
    pub max_scan_area: Option<Geometry>,
}

impl JobOverlay {
    /// Fold this layer over `base`; fields set here win.
    pub fn merged_over(self, base: JobOverlay) -> JobOverlay {
        JobOverlay {
            device: self.device.or(base.device),
            resolution: self.resolution.or(base.resolution),
            mode: self.mode.or(base.mode),
            geometry: self.geometry.or(base.geometry),
            layout: self.layout.or(base.layout),
            duplex: self.duplex.or(base.duplex),
            rotate: self.rotate.or(base.rotate),
            pages: self.pages.or(base.pages),
            documents: self.documents.or(base.documents),
            center_offset: self.center_offset.or(base.center_offset),
            vertical_offset_mm: self.vertical_offset_mm.or(base.vertical_offset_mm),
            remove_blanks: self.remove_blanks.or(base.remove_blanks),
            max_scan_area: self.max_scan_area.or(base.max_scan_area),
        }
    }
}

/// Process-wide scan job settings. Built once, immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanJob {
    /// Scanner device id (backend syntax, e.g. `fujitsu:fi-4120C:1`).
    pub device: String,
    /// Capture resolution in DPI.
    pub resolution_dpi: u32,
    pub mode: ScanMode,
    pub geometry: Geometry,
    pub layout: Layout,
    pub duplex: DuplexMode,
    /// Whole-image rotation applied before cleanup, degrees in [0, 360).
    pub rotate_degrees: u16,
    /// Raw captures per document.
    pub pages: Count,
    /// Number of documents in the batch.
    pub documents: Count,
    /// Centre the scan area on the glass.
    pub center_offset: bool,
    /// Extra top offset in millimetres.
    pub vertical_offset_mm: Option<f64>,
    /// Let the scan backend drop blank captures.
    pub remove_blanks: bool,
    /// Overwrite an existing destination.
    pub force: bool,
    pub output: OutputTarget,
    /// Device maximum scan area, if the device config declares one.
    pub max_scan_area: Option<Geometry>,
}

impl ScanJob {
    /// Build the final immutable job from a fully merged overlay.
    pub fn resolve(overlay: JobOverlay, output: OutputTarget, force: bool) -> ScanJob {
        let job = ScanJob {
            device: overlay.device.unwrap_or_else(|| "default".into()),
            resolution_dpi: overlay.resolution.unwrap_or(300),
            mode: overlay.mode.unwrap_or(ScanMode::Lineart),
            geometry: overlay.geometry.unwrap_or(Geometry::A4),
            layout: overlay.layout.unwrap_or(Layout::Single),
            duplex: overlay.duplex.unwrap_or(DuplexMode::None),
            rotate_degrees: overlay.rotate.unwrap_or(0),
            pages: overlay.pages.unwrap_or(Count::Unbounded),
            documents: overlay.documents.unwrap_or(Count::Bounded(1)),
            center_offset: overlay.center_offset.unwrap_or(false),
            vertical_offset_mm: overlay.vertical_offset_mm,
            remove_blanks: overlay.remove_blanks.unwrap_or(false),
            force,
            output,
            max_scan_area: overlay.max_scan_area,
        };
        debug!(device = %job.device, layout = ?job.layout, "job settings resolved");
        job
    }

    /// Validate the job before anything external runs.
    ///
    /// Everything caught here is a configuration error: the process exits
    /// without having started a scan, so there is no state to clean up.
    pub fn validate(&self) -> Result<()> {
        if self.pages.is_unbounded() && self.documents.is_unbounded() {
            return Err(ScanwerkError::BothCountsUnbounded);
        }

        if self.pages.is_unbounded() {
            if self.duplex != DuplexMode::None {
                return Err(ScanwerkError::UnboundedPages {
                    feature: "duplex scanning",
                });
            }
            if self.remove_blanks {
                return Err(ScanwerkError::UnboundedPages {
                    feature: "blank-page removal",
                });
            }
            // Without a page count there is no way to split the stream
            // into more than one document.
            if self.documents.bounded().is_some_and(|d| d > 1) {
                return Err(ScanwerkError::UnboundedPages {
                    feature: "multi-document batches",
                });
            }
        }

        if let Some(pages) = self.pages.bounded() {
            if pages == 0 {
                return Err(ScanwerkError::Config("page count must be at least 1".into()));
            }
            if pages % 2 == 1 {
                if self.remove_blanks {
                    return Err(ScanwerkError::OddPageCount {
                        pages,
                        feature: "blank-page removal",
                    });
                }
                if self.duplex != DuplexMode::None {
                    return Err(ScanwerkError::OddPageCount {
                        pages,
                        feature: "duplex scanning",
                    });
                }
                if self.layout == Layout::DoubleFolded {
                    return Err(ScanwerkError::OddPageCount {
                        pages,
                        feature: "the double-folded layout",
                    });
                }
            }
        }

        if self.documents.bounded() == Some(0) {
            return Err(ScanwerkError::Config(
                "document count must be at least 1".into(),
            ));
        }

        if self.remove_blanks && self.layout != Layout::Single {
            return Err(ScanwerkError::Config(
                "blank-page removal requires the single layout".into(),
            ));
        }

        if self.resolution_dpi == 0 {
            return Err(ScanwerkError::Config("resolution must be positive".into()));
        }

        if self.rotate_degrees >= 360 {
            return Err(ScanwerkError::Config(format!(
                "rotation {}° is outside [0, 360)",
                self.rotate_degrees
            )));
        }

        if self.geometry.width_mm <= 0.0 || self.geometry.height_mm <= 0.0 {
            return Err(ScanwerkError::Geometry(format!(
                "non-positive scan area {}",
                self.geometry
            )));
        }
        if self.geometry.x_offset_mm < 0.0 || self.geometry.y_offset_mm < 0.0 {
            return Err(ScanwerkError::Geometry(format!(
                "negative offsets in {}",
                self.geometry
            )));
        }
        if let Some(max) = &self.max_scan_area {
            if !self.geometry.fits_within(max) {
                return Err(ScanwerkError::ScanAreaExceeded {
                    requested: self.geometry.to_string(),
                    max: max.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Refuse to clobber an existing destination unless `--force` is set.
    ///
    /// Runs before the working directory is created so a failed check
    /// leaves nothing behind.
    pub fn check_destination(&self) -> Result<()> {
        let path = self.output.collision_path();
        if !self.force && path.exists() {
            return Err(ScanwerkError::DestinationExists {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Raw captures expected for the whole batch, when both counts are
    /// bounded. `None` in unbounded mode.
    pub fn expected_captures(&self) -> Option<u32> {
        match (self.pages.bounded(), self.documents.bounded()) {
            (Some(p), Some(d)) => Some(p * d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn base_job() -> ScanJob {
        ScanJob::resolve(
            JobOverlay {
                pages: Some(Count::Bounded(4)),
                ..Default::default()
            },
            OutputTarget::SingleFile(PathBuf::from("/nonexistent/out.pdf")),
            false,
        )
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let job = ScanJob::resolve(
            JobOverlay::default(),
            OutputTarget::SingleFile(PathBuf::from("out.pdf")),
            false,
        );
        assert_eq!(job.resolution_dpi, 300);
        assert_eq!(job.mode, ScanMode::Lineart);
        assert_eq!(job.layout, Layout::Single);
        assert_eq!(job.pages, Count::Unbounded);
        assert_eq!(job.documents, Count::Bounded(1));
    }

    #[test]
    fn overlay_precedence_is_last_over_first() {
        let global = JobOverlay {
            resolution: Some(150),
            device: Some("global-dev".into()),
            ..Default::default()
        };
        let device = JobOverlay {
            resolution: Some(300),
            ..Default::default()
        };
        let cli = JobOverlay {
            mode: Some(ScanMode::Gray),
            ..Default::default()
        };

        let merged = cli.merged_over(device.merged_over(global));
        assert_eq!(merged.resolution, Some(300)); // device beats global
        assert_eq!(merged.device.as_deref(), Some("global-dev")); // global survives
        assert_eq!(merged.mode, Some(ScanMode::Gray)); // cli wins
    }

    #[test]
    fn both_counts_unbounded_is_rejected() {
        let mut job = base_job();
        job.pages = Count::Unbounded;
        job.documents = Count::Unbounded;
        assert!(matches!(
            job.validate(),
            Err(ScanwerkError::BothCountsUnbounded)
        ));
    }

    #[test]
    fn odd_pages_with_blank_removal_is_rejected() {
        let mut job = base_job();
        job.pages = Count::Bounded(5);
        job.remove_blanks = true;
        let err = job.validate().unwrap_err();
        assert!(matches!(err, ScanwerkError::OddPageCount { pages: 5, .. }));
        assert!(err.is_config_error());
    }

    #[test]
    fn odd_pages_with_duplex_is_rejected() {
        let mut job = base_job();
        job.pages = Count::Bounded(3);
        job.duplex = DuplexMode::Manual;
        assert!(matches!(
            job.validate(),
            Err(ScanwerkError::OddPageCount { pages: 3, .. })
        ));
    }

    #[test]
    fn unbounded_pages_forbid_duplex() {
        let mut job = base_job();
        job.pages = Count::Unbounded;
        job.duplex = DuplexMode::Adf;
        assert!(matches!(
            job.validate(),
            Err(ScanwerkError::UnboundedPages { .. })
        ));
    }

    #[test]
    fn scan_area_must_fit_device_maximum() {
        let mut job = base_job();
        job.geometry = Geometry {
            width_mm: 300.0,
            height_mm: 400.0,
            x_offset_mm: 0.0,
            y_offset_mm: 0.0,
        };
        job.max_scan_area = Some(Geometry::A4);
        assert!(matches!(
            job.validate(),
            Err(ScanwerkError::ScanAreaExceeded { .. })
        ));
    }

    #[test]
    fn valid_job_passes() {
        assert!(base_job().validate().is_ok());
    }

    #[test]
    fn existing_destination_without_force_is_rejected() {
        let dir = std::env::temp_dir();
        let path = dir.join("scanwerk-config-test-existing.pdf");
        std::fs::write(&path, b"occupied").unwrap();

        let mut job = base_job();
        job.output = OutputTarget::SingleFile(path.clone());
        assert!(matches!(
            job.check_destination(),
            Err(ScanwerkError::DestinationExists { .. })
        ));

        job.force = true;
        assert!(job.check_destination().is_ok());

        std::fs::remove_file(&path).ok();
    }
}
