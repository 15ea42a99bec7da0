// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembler: merge one document's target-page images, in
// ascending target order, into its final PDF.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use scanwerk_core::config::ScanJob;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::DocumentRange;

use crate::tools::ToolChain;
use crate::workdir::WorkDir;

/// Assemble one document from its target range.
///
/// The phase barrier guarantees every page image in the range already
/// exists and is closed; concatenation order is strictly ascending
/// target index. Failures name the document so the user knows which
/// output is missing.
#[instrument(skip_all, fields(document = doc.index + 1))]
pub async fn assemble_document(
    job: Arc<ScanJob>,
    doc: DocumentRange,
    tools: Arc<dyn ToolChain>,
    work: Arc<WorkDir>,
) -> Result<PathBuf> {
    let inputs: Vec<PathBuf> = doc.targets().map(|t| work.target_page(t)).collect();
    let artifact = work.document_artifact(doc.index);

    tools
        .concatenate(&inputs, &artifact)
        .await
        .map_err(|e| ScanwerkError::Assembly {
            document: doc.index + 1,
            detail: e.to_string(),
        })?;

    tools
        .encode(&artifact, &doc.output, job.mode.compression())
        .await
        .map_err(|e| ScanwerkError::Assembly {
            document: doc.index + 1,
            detail: e.to_string(),
        })?;

    info!(path = %doc.output.display(), pages = doc.page_count(), "document written");
    Ok(doc.output)
}
