// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable diagnosis of pipeline errors for the CLI.
//
// Every error maps to a plain-English message, an actionable suggestion,
// and a severity that drives the process exit code.

use crate::error::ScanwerkError;

/// Severity of an error from the invoking user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The command line or config file is wrong; nothing was scanned.
    Usage,
    /// An external collaborator (scanner or tool) failed mid-run.
    External,
    /// Something on this host failed (I/O, memory probe, task join).
    Host,
}

impl Severity {
    /// Conventional exit codes: 2 for usage errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage => 2,
            Self::External | Self::Host => 1,
        }
    }
}

/// A diagnosis the CLI can print directly.
#[derive(Debug, Clone)]
pub struct Diagnosis {
    /// Plain-English summary of what went wrong.
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `ScanwerkError` into something printable for the terminal.
pub fn diagnose(err: &ScanwerkError) -> Diagnosis {
    match err {
        // -- Configuration --
        ScanwerkError::BothCountsUnbounded => Diagnosis {
            message: "Page and document counts can't both be open-ended.".into(),
            suggestion: "Pass --pages N or --documents N so the batch has a known shape.".into(),
            severity: Severity::Usage,
        },

        ScanwerkError::OddPageCount { pages, feature } => Diagnosis {
            message: format!("An odd page count ({pages}) doesn't work with {feature}."),
            suggestion: "Use an even --pages value, or drop the conflicting option.".into(),
            severity: Severity::Usage,
        },

        ScanwerkError::UnboundedPages { feature } => Diagnosis {
            message: format!("An open-ended page count doesn't work with {feature}."),
            suggestion: "Pass an explicit --pages value.".into(),
            severity: Severity::Usage,
        },

        ScanwerkError::Geometry(detail) => Diagnosis {
            message: format!("The scan area is invalid: {detail}."),
            suggestion: "Check the --width/--height size and --left/--top offset values.".into(),
            severity: Severity::Usage,
        },

        ScanwerkError::ScanAreaExceeded { requested, max } => Diagnosis {
            message: format!("The requested area {requested} is larger than the scanner's glass ({max})."),
            suggestion: "Reduce the scan area, or fix max_scan_area in the device config.".into(),
            severity: Severity::Usage,
        },

        ScanwerkError::DestinationExists { path } => Diagnosis {
            message: format!("{} already exists.", path.display()),
            suggestion: "Pick a different output path, or pass --force to overwrite.".into(),
            severity: Severity::Usage,
        },

        ScanwerkError::Config(detail) => Diagnosis {
            message: format!("Invalid configuration: {detail}."),
            suggestion: "Check the command line and config file.".into(),
            severity: Severity::Usage,
        },

        // -- Planning --
        ScanwerkError::EmptyDocument(doc) => Diagnosis {
            message: format!("Document {doc} ended up with no pages."),
            suggestion: "Every page of that document was removed as blank — rescan it, or turn off blank-page removal.".into(),
            severity: Severity::External,
        },

        ScanwerkError::IncompleteDocument { got, per_doc } => Diagnosis {
            message: format!("Only {got} pages arrived for documents of {per_doc} pages."),
            suggestion: "Check the feeder for double-feeds or jams and rescan the batch.".into(),
            severity: Severity::External,
        },

        ScanwerkError::UnexpectedPage(page) => Diagnosis {
            message: format!("The scanner produced page {page}, beyond the configured batch."),
            suggestion: "The feeder held more sheets than --pages × --documents. Adjust the counts or the stack.".into(),
            severity: Severity::External,
        },

        // -- Execution --
        ScanwerkError::Scan(detail) => Diagnosis {
            message: format!("Scanning failed: {detail}."),
            suggestion: "Make sure the scanner is connected and the device id is right (try --device).".into(),
            severity: Severity::External,
        },

        ScanwerkError::ToolFailed { tool, status, context } => Diagnosis {
            message: format!("{tool} failed ({status}) while processing {context}."),
            suggestion: format!("Run {tool} by hand on the file to see its own error output."),
            severity: Severity::External,
        },

        ScanwerkError::Assembly { document, detail } => Diagnosis {
            message: format!("Could not assemble document {document}: {detail}."),
            suggestion: "The page images exist but merging failed — check disk space and the encoder install.".into(),
            severity: Severity::External,
        },

        // -- Host --
        ScanwerkError::Memory(detail) => Diagnosis {
            message: format!("Could not read system memory state: {detail}."),
            suggestion: "Memory-aware throttling needs host memory statistics to work.".into(),
            severity: Severity::Host,
        },

        ScanwerkError::WorkerJoin(detail) => Diagnosis {
            message: format!("A worker task died unexpectedly: {detail}."),
            suggestion: "This is a bug — please report it with the log output.".into(),
            severity: Severity::Host,
        },

        ScanwerkError::Io(detail) => Diagnosis {
            message: format!("File I/O failed: {detail}."),
            suggestion: "Check permissions and free space on the temp and output locations.".into(),
            severity: Severity::Host,
        },
    }
}
