// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — domain types, configuration, layout resolution, and document
// planning shared across all crates. No I/O beyond pre-flight checks.

pub mod config;
pub mod diagnose;
pub mod error;
pub mod layout;
pub mod plan;
pub mod types;

pub use config::{JobOverlay, ScanJob};
pub use error::ScanwerkError;
pub use types::*;
