// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 1-based index of one raw scanner capture.
///
/// Produced by the scan backend, consumed exactly once by a page worker,
/// and deleted after its sides have been converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawPageId(pub u32);

impl fmt::Display for RawPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based index of one logical page in final reading order.
///
/// Target indices are dense and contiguous across all documents combined;
/// no two page workers ever produce the same target index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetPageId(pub u32);

impl fmt::Display for TargetPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical scanning arrangement, determining the raw-to-target mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// One raw capture is one finished page.
    Single,
    /// One raw capture holds two facing pages side by side.
    Double,
    /// A folded sheet scanned open — four logical pages per two captures,
    /// presented in reversed, rotated order relative to reading order.
    DoubleFolded,
}

impl Layout {
    /// Name the cleanup tool uses for its `--layout` option.
    pub fn cleanup_name(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double | Self::DoubleFolded => "double",
        }
    }

    /// Number of side images the cleanup tool emits per capture.
    pub fn sides_per_capture(&self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Double | Self::DoubleFolded => 2,
        }
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "double" => Ok(Self::Double),
            "double-folded" => Ok(Self::DoubleFolded),
            other => Err(format!("unknown layout '{other}' (expected single, double, or double-folded)")),
        }
    }
}

/// Scanner colour mode. Drives both the capture and the final encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// 1-bit black and white.
    Lineart,
    /// 8-bit grayscale.
    Gray,
    /// 24-bit colour.
    Color,
}

impl ScanMode {
    /// Name passed to the scan backend's `--mode` option.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Lineart => "Lineart",
            Self::Gray => "Gray",
            Self::Color => "Color",
        }
    }

    /// Compression family for the final encoder.
    pub fn compression(&self) -> Compression {
        match self {
            Self::Lineart => Compression::Bilevel,
            Self::Gray | Self::Color => Compression::Photographic,
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lineart" => Ok(Self::Lineart),
            "gray" => Ok(Self::Gray),
            "color" => Ok(Self::Color),
            other => Err(format!("unknown mode '{other}' (expected lineart, gray, or color)")),
        }
    }
}

/// Compression family applied by the final PDF encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// CCITT-style bi-level compression for lineart scans.
    Bilevel,
    /// JPEG-style photographic compression for gray/colour scans.
    Photographic,
}

/// Duplex strategy for double-sided originals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplexMode {
    /// Single-sided originals.
    None,
    /// The feeder captures both sides in one pass.
    Adf,
    /// Two passes — odd sides first, then the user flips the stack.
    Manual,
}

impl FromStr for DuplexMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "adf" => Ok(Self::Adf),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown duplex mode '{other}' (expected none, adf, or manual)")),
        }
    }
}

/// A page or document count that may be left open-ended.
///
/// At most one of the two counts in a job may be unbounded at a time.
/// Serialized as a plain integer or the string `"unbounded"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Bounded(u32),
    /// Scan until the feeder is empty.
    Unbounded,
}

impl Serialize for Count {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bounded(n) => serializer.serialize_u32(*n),
            Self::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountVisitor;

        impl serde::de::Visitor<'_> for CountVisitor {
            type Value = Count;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or the string \"unbounded\"")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Count, E> {
                u32::try_from(v)
                    .map(Count::Bounded)
                    .map_err(|_| E::custom(format!("count {v} out of range")))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Count, E> {
                u32::try_from(v)
                    .map(Count::Bounded)
                    .map_err(|_| E::custom(format!("count {v} out of range")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Count, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CountVisitor)
    }
}

impl Count {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// The bounded value, if there is one.
    pub fn bounded(&self) -> Option<u32> {
        match self {
            Self::Bounded(n) => Some(*n),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl FromStr for Count {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "unbounded" {
            return Ok(Self::Unbounded);
        }
        s.parse::<u32>()
            .map(Self::Bounded)
            .map_err(|_| format!("expected a number or 'unbounded', got '{s}'"))
    }
}

/// Physical scan-area geometry in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub width_mm: f64,
    pub height_mm: f64,
    /// Left edge offset from the scan-glass origin.
    #[serde(default)]
    pub x_offset_mm: f64,
    /// Top edge offset from the scan-glass origin.
    #[serde(default)]
    pub y_offset_mm: f64,
}

impl Geometry {
    /// A4 portrait, the built-in default.
    pub const A4: Geometry = Geometry {
        width_mm: 210.0,
        height_mm: 297.0,
        x_offset_mm: 0.0,
        y_offset_mm: 0.0,
    };

    /// True when the area fits inside `max` (offsets included).
    pub fn fits_within(&self, max: &Geometry) -> bool {
        self.x_offset_mm + self.width_mm <= max.width_mm + 1e-9
            && self.y_offset_mm + self.height_mm <= max.height_mm + 1e-9
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}mm+{}+{}",
            self.width_mm, self.height_mm, self.x_offset_mm, self.y_offset_mm
        )
    }
}

/// Where finished documents are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Single-document runs write one fixed path.
    SingleFile(PathBuf),
    /// A directory created by the run; documents are numbered inside it.
    Directory(PathBuf),
}

impl OutputTarget {
    /// Resolve the output path for document `index` (0-based) of
    /// `total` documents.
    ///
    /// A `SingleFile` target with more than one document degrades to
    /// zero-padded numbered siblings of the requested path.
    pub fn path_for(&self, index: u32, total: u32) -> PathBuf {
        match self {
            Self::SingleFile(path) => {
                if total <= 1 {
                    path.clone()
                } else {
                    numbered_sibling(path, index)
                }
            }
            Self::Directory(dir) => dir.join(format!("document-{:03}.pdf", index + 1)),
        }
    }

    /// The path whose prior existence blocks the run without `--force`.
    pub fn collision_path(&self) -> &Path {
        match self {
            Self::SingleFile(path) => path,
            Self::Directory(dir) => dir,
        }
    }
}

/// `out.pdf` → `out-001.pdf`, `out-002.pdf`, ...
fn numbered_sibling(path: &Path, index: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".into());
    path.with_file_name(format!("{stem}-{:03}.{ext}", index + 1))
}

/// One finished output unit: a contiguous half-open target range plus the
/// path its PDF is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRange {
    /// 0-based document index (also the output numbering key).
    pub index: u32,
    /// First target page in the document (inclusive).
    pub start: TargetPageId,
    /// One past the last target page (exclusive).
    pub end: TargetPageId,
    /// Final output path.
    pub output: PathBuf,
}

impl DocumentRange {
    pub fn page_count(&self) -> u32 {
        self.end.0 - self.start.0
    }

    /// All target ids in the range, ascending.
    pub fn targets(&self) -> impl Iterator<Item = TargetPageId> + '_ {
        (self.start.0..self.end.0).map(TargetPageId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_parses_numbers_and_sentinel() {
        assert_eq!("12".parse::<Count>(), Ok(Count::Bounded(12)));
        assert_eq!("unbounded".parse::<Count>(), Ok(Count::Unbounded));
        assert!("twelve".parse::<Count>().is_err());
    }

    #[test]
    fn layout_cleanup_names() {
        assert_eq!(Layout::Single.cleanup_name(), "single");
        assert_eq!(Layout::Double.cleanup_name(), "double");
        // A folded sheet is still a two-sided capture for the cleanup tool.
        assert_eq!(Layout::DoubleFolded.cleanup_name(), "double");
    }

    #[test]
    fn geometry_capability_check() {
        let a4 = Geometry::A4;
        let letter_ish = Geometry {
            width_mm: 216.0,
            height_mm: 279.0,
            x_offset_mm: 0.0,
            y_offset_mm: 0.0,
        };
        assert!(a4.fits_within(&Geometry {
            width_mm: 216.0,
            height_mm: 297.0,
            x_offset_mm: 0.0,
            y_offset_mm: 0.0,
        }));
        assert!(!letter_ish.fits_within(&a4));
    }

    #[test]
    fn single_file_target_degrades_to_numbered_paths() {
        let target = OutputTarget::SingleFile(PathBuf::from("/out/scan.pdf"));
        assert_eq!(target.path_for(0, 1), PathBuf::from("/out/scan.pdf"));
        assert_eq!(target.path_for(0, 3), PathBuf::from("/out/scan-001.pdf"));
        assert_eq!(target.path_for(2, 3), PathBuf::from("/out/scan-003.pdf"));
    }

    #[test]
    fn directory_target_numbers_documents() {
        let target = OutputTarget::Directory(PathBuf::from("/out/batch"));
        assert_eq!(
            target.path_for(1, 5),
            PathBuf::from("/out/batch/document-002.pdf")
        );
    }

    #[test]
    fn document_range_targets_ascend() {
        let doc = DocumentRange {
            index: 0,
            start: TargetPageId(5),
            end: TargetPageId(9),
            output: PathBuf::from("x.pdf"),
        };
        let ids: Vec<u32> = doc.targets().map(|t| t.0).collect();
        assert_eq!(ids, vec![5, 6, 7, 8]);
        assert_eq!(doc.page_count(), 4);
    }
}
