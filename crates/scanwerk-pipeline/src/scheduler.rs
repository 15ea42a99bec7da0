// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Two-phase fan-out/fan-in scheduler.
//
// Phase A launches one page worker per raw capture; Phase B launches one
// assembler per document. Both phases follow the same admission pattern
// and end in a full barrier join — Phase B never starts until every page
// worker has exited, so every target image a document needs exists and
// is closed before it is read.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{info, instrument};

use scanwerk_core::config::ScanJob;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::plan::DocumentPlan;

use crate::assemble::assemble_document;
use crate::memory::{AdmissionController, MemoryProbe};
use crate::scan::ScanSource;
use crate::tools::ToolChain;
use crate::worker::process_page;
use crate::workdir::WorkDir;

/// What a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub raw_pages: usize,
    pub target_pages: u32,
    /// Final document paths, in document order.
    pub outputs: Vec<PathBuf>,
}

/// Run the whole pipeline: validate, scan, plan, fan out page workers,
/// barrier, fan out assemblers, barrier, report.
///
/// The working directory is removed on every exit path, including
/// failures, via its Drop.
#[instrument(skip_all, fields(device = %job.device))]
pub async fn run_pipeline(
    job: ScanJob,
    scan: &dyn ScanSource,
    tools: Arc<dyn ToolChain>,
    probe: Arc<dyn MemoryProbe>,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let clock = Instant::now();

    // Everything caught here exits before the working directory exists.
    job.validate()?;
    job.check_destination()?;

    if let scanwerk_core::types::OutputTarget::Directory(dir) = &job.output {
        std::fs::create_dir_all(dir)?;
    }

    let admission = AdmissionController::new(probe)?;
    let work = Arc::new(WorkDir::create()?);

    let present = scan.acquire(&job, &work).await?;
    let plan = DocumentPlan::build(&present, &job)?;
    let job = Arc::new(job);

    info!(
        raw_pages = plan.pages.len(),
        documents = plan.documents.len(),
        constrained = admission.started_constrained(),
        "fan-out phase A: page workers"
    );
    let reduced = admission.reduced_quality();
    run_phase(&admission, plan.pages.clone(), |page| {
        let job = Arc::clone(&job);
        let tools = Arc::clone(&tools);
        let work = Arc::clone(&work);
        async move { process_page(job, page, tools, work, reduced).await }
    })
    .await?;

    info!(documents = plan.documents.len(), "fan-out phase B: assembly");
    run_phase(&admission, plan.documents.clone(), |doc| {
        let job = Arc::clone(&job);
        let tools = Arc::clone(&tools);
        let work = Arc::clone(&work);
        async move { assemble_document(job, doc, tools, work).await.map(|_| ()) }
    })
    .await?;

    let report = RunReport {
        started_at,
        elapsed: clock.elapsed(),
        raw_pages: plan.pages.len(),
        target_pages: plan.target_count(),
        outputs: plan.documents.iter().map(|d| d.output.clone()).collect(),
    };
    info!(
        documents = report.outputs.len(),
        pages = report.target_pages,
        elapsed_ms = report.elapsed.as_millis(),
        "pipeline finished"
    );
    Ok(report)
}

/// One fan-out phase under the admission policy, ending in a full
/// barrier join.
///
/// Constrained mode admits exactly one worker at a time and stops at the
/// first failure. Unconstrained mode launches fire-and-forget, waits for
/// memory headroom between admissions, and joins everything before
/// reporting the first failure — a launched worker is always awaited.
async fn run_phase<I, F, Fut>(
    admission: &AdmissionController,
    items: Vec<I>,
    launch: F,
) -> Result<()>
where
    I: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    if admission.started_constrained() {
        for item in items {
            launch(item).await?;
        }
        return Ok(());
    }

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    for item in items {
        tasks.spawn(launch(item));
        admission.wait_for_headroom().await?;
    }

    let mut first_failure: Option<ScanwerkError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                first_failure.get_or_insert(e);
            }
            Err(join_err) => {
                first_failure.get_or_insert(ScanwerkError::WorkerJoin(join_err.to_string()));
            }
        }
    }

    match first_failure {
        None => Ok(()),
        Some(e) => Err(e),
    }
}
