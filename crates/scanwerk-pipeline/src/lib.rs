// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk orchestration core — memory admission, external tool
// collaborators, page workers, document assemblers, and the two-phase
// fan-out/fan-in scheduler.

pub mod assemble;
pub mod memory;
pub mod scan;
pub mod scheduler;
pub mod tools;
pub mod worker;
pub mod workdir;

pub use memory::{AdmissionController, MemoryProbe, SystemMemoryProbe};
pub use scan::{SaneScanSource, ScanSource};
pub use scheduler::{run_pipeline, RunReport};
pub use tools::{CommandToolChain, ToolChain};
pub use workdir::WorkDir;
