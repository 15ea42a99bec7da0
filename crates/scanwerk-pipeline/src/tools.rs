// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External image-tool collaborators.
//
// Every image operation is delegated to an external process; this module
// only builds command lines and checks exit status. The trait seam lets
// the scheduler tests substitute a recording fake for the real tools.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::layout::Prerotation;
use scanwerk_core::types::{Compression, Geometry, Layout, ScanMode};

/// Everything the cleanup/deskew tool needs for one capture.
#[derive(Debug)]
pub struct CleanupRequest<'a> {
    pub input: &'a Path,
    /// The tool appends `-1`/`-2` (via its `%d` pattern) for the sides.
    pub output_stem: &'a Path,
    pub dpi: u32,
    pub layout: Layout,
    pub geometry: Geometry,
    pub mode: ScanMode,
    /// ±90° rotation before the split, for folded sheets.
    pub prerotate: Prerotation,
    /// Skip the expensive deskew sub-stage on small hosts.
    pub reduced_quality: bool,
}

/// The per-page and per-document image operations, success/failure only.
#[async_trait]
pub trait ToolChain: Send + Sync {
    /// Rotate a whole capture by `degrees` in [0, 360).
    async fn rotate(&self, input: &Path, output: &Path, degrees: u16) -> Result<()>;

    /// Deskew/clean one capture, emitting 1 or 2 side images.
    async fn clean(&self, req: CleanupRequest<'_>) -> Result<()>;

    /// Convert one cleaned side into an intermediate page image.
    async fn rasterize(&self, side: &Path, output: &Path, dpi: u32) -> Result<()>;

    /// Merge intermediate page images, in the given order, into one
    /// multi-page artifact.
    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Encode a multi-page artifact into the final PDF.
    async fn encode(&self, input: &Path, output: &Path, compression: Compression) -> Result<()>;
}

/// Command names for the real tool chain; overridable via config later.
#[derive(Debug, Clone)]
pub struct ToolCommands {
    pub rotate: String,
    pub cleanup: String,
    pub rasterize: String,
    pub concatenate: String,
    pub encode: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            rotate: "convert".into(),
            cleanup: "unpaper".into(),
            rasterize: "convert".into(),
            concatenate: "tiffcp".into(),
            encode: "tiff2pdf".into(),
        }
    }
}

/// Production tool chain spawning one OS process per operation.
#[derive(Debug, Clone, Default)]
pub struct CommandToolChain {
    commands: ToolCommands,
}

impl CommandToolChain {
    pub fn new(commands: ToolCommands) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl ToolChain for CommandToolChain {
    async fn rotate(&self, input: &Path, output: &Path, degrees: u16) -> Result<()> {
        let mut cmd = Command::new(&self.commands.rotate);
        cmd.arg(input)
            .arg("-rotate")
            .arg(degrees.to_string())
            .arg(output);
        run_tool(&self.commands.rotate, cmd, &display(input)).await
    }

    async fn clean(&self, req: CleanupRequest<'_>) -> Result<()> {
        let mut cmd = Command::new(&self.commands.cleanup);
        cmd.arg("--layout")
            .arg(req.layout.cleanup_name())
            .arg("--dpi")
            .arg(req.dpi.to_string())
            .arg("--output-pages")
            .arg(req.layout.sides_per_capture().to_string())
            .arg("--sheet-size")
            .arg(format!(
                "{}mm,{}mm",
                req.geometry.width_mm, req.geometry.height_mm
            ));

        match req.prerotate {
            Prerotation::None => {}
            rot => {
                cmd.arg("--pre-rotate").arg(rot.degrees().to_string());
            }
        }

        // The black-border filter eats photographic content; only lineart
        // scans get the full mask treatment.
        match req.mode {
            ScanMode::Lineart => {
                cmd.arg("--mask-scan-direction").arg("h,v");
            }
            ScanMode::Gray | ScanMode::Color => {
                cmd.arg("--no-blackfilter").arg("--no-grayfilter");
            }
        }

        if req.reduced_quality {
            cmd.arg("--no-qpixels");
        }

        let mut pattern = req.output_stem.as_os_str().to_os_string();
        pattern.push("-%d.pnm");
        cmd.arg(req.input).arg(pattern);

        run_tool(&self.commands.cleanup, cmd, &display(req.input)).await
    }

    async fn rasterize(&self, side: &Path, output: &Path, dpi: u32) -> Result<()> {
        let mut cmd = Command::new(&self.commands.rasterize);
        cmd.arg(side)
            .arg("-density")
            .arg(dpi.to_string())
            .arg(output);
        run_tool(&self.commands.rasterize, cmd, &display(side)).await
    }

    async fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.commands.concatenate);
        for input in inputs {
            cmd.arg(input);
        }
        cmd.arg(output);
        run_tool(
            &self.commands.concatenate,
            cmd,
            &format!("{} page images", inputs.len()),
        )
        .await
    }

    async fn encode(&self, input: &Path, output: &Path, compression: Compression) -> Result<()> {
        let mut cmd = Command::new(&self.commands.encode);
        match compression {
            Compression::Bilevel => {
                cmd.arg("-c").arg("g4");
            }
            Compression::Photographic => {
                cmd.arg("-c").arg("jpeg");
            }
        }
        cmd.arg("-o").arg(output).arg(input);
        run_tool(&self.commands.encode, cmd, &display(input)).await
    }
}

/// Run one external tool to completion; non-zero exit is fatal for the
/// caller's worker.
pub(crate) async fn run_tool(tool: &str, mut cmd: Command, context: &str) -> Result<()> {
    debug!(tool, context, "spawning external tool");
    cmd.stdin(Stdio::null());

    let output = cmd
        .output()
        .await
        .map_err(|e| ScanwerkError::ToolFailed {
            tool: tool.to_string(),
            status: format!("failed to launch: {e}"),
            context: context.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(tool, status = %output.status, stderr = %stderr.trim(), "tool failed");
        return Err(ScanwerkError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            context: context.to_string(),
        });
    }

    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nonzero_exit_maps_to_tool_failed() {
        let mut cmd = Command::new("false");
        cmd.arg("ignored");
        let err = run_tool("false", cmd, "test input").await.unwrap_err();
        match err {
            ScanwerkError::ToolFailed { tool, context, .. } => {
                assert_eq!(tool, "false");
                assert_eq!(context, "test input");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_maps_to_tool_failed() {
        let cmd = Command::new("scanwerk-no-such-binary");
        let err = run_tool("scanwerk-no-such-binary", cmd, "x").await.unwrap_err();
        assert!(matches!(err, ScanwerkError::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn successful_tool_returns_ok() {
        let cmd = Command::new("true");
        assert!(run_tool("true", cmd, "x").await.is_ok());
    }
}
