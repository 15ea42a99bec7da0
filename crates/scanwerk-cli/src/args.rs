// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface. Every option is optional — unset options fall
// through to the config file and then to built-in defaults.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use scanwerk_core::config::JobOverlay;
use scanwerk_core::types::{Count, DuplexMode, Geometry, Layout, ScanMode};

#[derive(Debug, Parser)]
#[command(
    name = "scanwerk",
    version,
    about = "Batch-scan pages and assemble them into finished PDFs"
)]
pub struct Cli {
    /// Output file (or directory with --directory)
    pub output: PathBuf,

    /// Scanner device id (SANE syntax)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Capture resolution in DPI
    #[arg(short, long)]
    pub resolution: Option<u32>,

    /// Colour mode: lineart, gray, or color
    #[arg(short, long, value_parser = parse_mode)]
    pub mode: Option<ScanMode>,

    /// Page layout: single, double, or double-folded
    #[arg(long, value_parser = parse_layout)]
    pub layout: Option<Layout>,

    /// Duplex strategy: none, adf, or manual
    #[arg(long, value_parser = parse_duplex)]
    pub duplex: Option<DuplexMode>,

    /// Rotate every capture by this many degrees before cleanup
    #[arg(long)]
    pub rotate: Option<u16>,

    /// Raw captures per document (a number, or "unbounded")
    #[arg(short, long, value_parser = parse_count)]
    pub pages: Option<Count>,

    /// Number of documents in the batch (a number, or "unbounded")
    #[arg(short = 'n', long, value_parser = parse_count)]
    pub documents: Option<Count>,

    /// Scan-area width in millimetres
    #[arg(long, requires = "height")]
    pub width: Option<f64>,

    /// Scan-area height in millimetres
    #[arg(long, requires = "width")]
    pub height: Option<f64>,

    /// Left scan offset in millimetres
    #[arg(long)]
    pub left: Option<f64>,

    /// Top scan offset in millimetres
    #[arg(long)]
    pub top: Option<f64>,

    /// Centre the scan area on the glass
    #[arg(long)]
    pub center: bool,

    /// Extra vertical offset in millimetres
    #[arg(long)]
    pub y_offset: Option<f64>,

    /// Let the backend drop blank pages
    #[arg(long)]
    pub remove_blanks: bool,

    /// Overwrite an existing destination
    #[arg(short, long)]
    pub force: bool,

    /// Treat OUTPUT as a directory and number documents inside it
    #[arg(long)]
    pub directory: bool,

    /// Config file path (default: $XDG_CONFIG_HOME/scanwerk/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scanner frontend command (default: scanimage)
    #[arg(long)]
    pub scan_command: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The CLI layer of the job settings — the highest-precedence one.
    pub fn overlay(&self) -> JobOverlay {
        let geometry = match (self.width, self.height) {
            (Some(width_mm), Some(height_mm)) => Some(Geometry {
                width_mm,
                height_mm,
                x_offset_mm: self.left.unwrap_or(0.0),
                y_offset_mm: self.top.unwrap_or(0.0),
            }),
            _ => None,
        };

        JobOverlay {
            device: self.device.clone(),
            resolution: self.resolution,
            mode: self.mode,
            geometry,
            layout: self.layout,
            duplex: self.duplex,
            rotate: self.rotate,
            pages: self.pages,
            documents: self.documents,
            center_offset: self.center.then_some(true),
            vertical_offset_mm: self.y_offset,
            remove_blanks: self.remove_blanks.then_some(true),
            max_scan_area: None,
        }
    }
}

fn parse_mode(s: &str) -> Result<ScanMode, String> {
    ScanMode::from_str(s)
}

fn parse_layout(s: &str) -> Result<Layout, String> {
    Layout::from_str(s)
}

fn parse_duplex(s: &str) -> Result<DuplexMode, String> {
    DuplexMode::from_str(s)
}

fn parse_count(s: &str) -> Result<Count, String> {
    Count::from_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invocation_parses() {
        let cli = Cli::parse_from(["scanwerk", "out.pdf"]);
        assert_eq!(cli.output, PathBuf::from("out.pdf"));
        assert!(cli.device.is_none());
        assert!(!cli.force);
    }

    #[test]
    fn counts_accept_the_unbounded_sentinel() {
        let cli = Cli::parse_from(["scanwerk", "-p", "unbounded", "-n", "3", "out.pdf"]);
        assert_eq!(cli.pages, Some(Count::Unbounded));
        assert_eq!(cli.documents, Some(Count::Bounded(3)));
    }

    #[test]
    fn geometry_needs_both_dimensions() {
        assert!(Cli::try_parse_from(["scanwerk", "--width", "210", "out.pdf"]).is_err());
        let cli = Cli::parse_from(["scanwerk", "--width", "210", "--height", "297", "out.pdf"]);
        let overlay = cli.overlay();
        assert_eq!(overlay.geometry.unwrap().width_mm, 210.0);
    }

    #[test]
    fn unset_flags_stay_unset_in_the_overlay() {
        // A false flag must not override a config-file `true`.
        let cli = Cli::parse_from(["scanwerk", "out.pdf"]);
        let overlay = cli.overlay();
        assert_eq!(overlay.remove_blanks, None);
        assert_eq!(overlay.center_offset, None);
    }

    #[test]
    fn layout_and_mode_parse_kebab_names() {
        let cli = Cli::parse_from([
            "scanwerk",
            "--layout",
            "double-folded",
            "-m",
            "gray",
            "out.pdf",
        ]);
        assert_eq!(cli.layout, Some(Layout::DoubleFolded));
        assert_eq!(cli.mode, Some(ScanMode::Gray));
    }
}
