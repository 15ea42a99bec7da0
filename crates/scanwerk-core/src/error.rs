// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Configuration errors (raised before any external process runs) --
    #[error("page count and document count cannot both be unbounded")]
    BothCountsUnbounded,

    #[error("odd page count {pages} is incompatible with {feature}")]
    OddPageCount { pages: u32, feature: &'static str },

    #[error("an unbounded page count is incompatible with {feature}")]
    UnboundedPages { feature: &'static str },

    #[error("invalid scan geometry: {0}")]
    Geometry(String),

    #[error("requested scan area {requested} exceeds the device maximum {max}")]
    ScanAreaExceeded { requested: String, max: String },

    #[error("destination {} already exists (pass --force to overwrite)", path.display())]
    DestinationExists { path: PathBuf },

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Planning errors (after scanning, before any worker runs) --
    #[error("document {0} has no pages left after blank removal")]
    EmptyDocument(u32),

    #[error("{got} scanned pages do not fill whole documents of {per_doc} pages")]
    IncompleteDocument { got: usize, per_doc: u32 },

    #[error("scanner produced page {0} beyond the configured page count")]
    UnexpectedPage(u32),

    // -- Execution errors (an external collaborator failed) --
    #[error("scan backend failed: {0}")]
    Scan(String),

    #[error("{tool} exited with {status} while processing {context}")]
    ToolFailed {
        tool: String,
        status: String,
        context: String,
    },

    #[error("assembly of document {document} failed: {detail}")]
    Assembly { document: u32, detail: String },

    #[error("memory probe failed: {0}")]
    Memory(String),

    #[error("worker task failed to join: {0}")]
    WorkerJoin(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanwerkError {
    /// True for errors detected before any external process has run.
    ///
    /// These are user mistakes; the pipeline never started and there is
    /// no scan state to clean up.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::BothCountsUnbounded
                | Self::OddPageCount { .. }
                | Self::UnboundedPages { .. }
                | Self::Geometry(_)
                | Self::ScanAreaExceeded { .. }
                | Self::DestinationExists { .. }
                | Self::Config(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
