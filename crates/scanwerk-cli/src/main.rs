// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — batch scanner-to-PDF pipeline.
//
// Entry point. Parses arguments, merges the layered configuration into
// one immutable job, runs the pipeline, and turns errors into something
// a person at a terminal can act on.

mod args;
mod config_file;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;

use scanwerk_core::config::ScanJob;
use scanwerk_core::diagnose::diagnose;
use scanwerk_core::error::Result;
use scanwerk_core::types::OutputTarget;
use scanwerk_pipeline::{
    run_pipeline, CommandToolChain, RunReport, SaneScanSource, SystemMemoryProbe,
};

use args::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("Scanwerk starting");

    match run(cli).await {
        Ok(report) => {
            tracing::info!(
                pages = report.target_pages,
                documents = report.outputs.len(),
                elapsed_s = format!("{:.1}", report.elapsed.as_secs_f64()),
                "done"
            );
            for path in &report.outputs {
                println!("{}", path.display());
            }
        }
        Err(e) => {
            let diagnosis = diagnose(&e);
            tracing::error!(error = %e, "run failed");
            eprintln!("{}", diagnosis.message);
            eprintln!("  {}", diagnosis.suggestion);
            std::process::exit(diagnosis.severity.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let file = config_file::load(cli.config.as_deref())?;

    // The device must be settled first — it selects the per-device table.
    let cli_overlay = cli.overlay();
    let device = cli_overlay
        .device
        .clone()
        .or_else(|| file.global.device.clone())
        .unwrap_or_else(|| "default".into());

    let overlay = cli_overlay
        .merged_over(file.device_overlay(&device).merged_over(file.global.clone()));

    let output = if cli.directory {
        OutputTarget::Directory(cli.output.clone())
    } else {
        OutputTarget::SingleFile(cli.output.clone())
    };

    let job = ScanJob::resolve(overlay, output, cli.force);

    let scanner = SaneScanSource::new(
        cli.scan_command.as_deref().unwrap_or("scanimage"),
    )
    .with_turn_stack(Box::new(|| {
        eprint!("Flip the stack, then press Enter to scan the reverse sides... ");
        std::io::stderr().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    }));

    run_pipeline(
        job,
        &scanner,
        Arc::new(CommandToolChain::default()),
        Arc::new(SystemMemoryProbe::new()),
    )
    .await
}
