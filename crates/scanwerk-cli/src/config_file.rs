// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TOML configuration file: a `[global]` table of defaults plus optional
// `[device."<id>"]` tables carrying per-device overrides and capability
// limits. Precedence is CLI > device > global > built-in default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use scanwerk_core::config::JobOverlay;
use scanwerk_core::error::{Result, ScanwerkError};

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub global: JobOverlay,
    #[serde(default)]
    pub device: BTreeMap<String, JobOverlay>,
}

impl ConfigFile {
    /// The per-device overlay for `device`, if the file has one.
    pub fn device_overlay(&self, device: &str) -> JobOverlay {
        self.device.get(device).cloned().unwrap_or_default()
    }
}

/// Load the config file.
///
/// An explicitly passed path must exist; the conventional default path
/// is optional — a missing file just means built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<ConfigFile> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ScanwerkError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => {
            let Some(path) = default_path() else {
                return Ok(ConfigFile::default());
            };
            if !path.exists() {
                return Ok(ConfigFile::default());
            }
            path
        }
    };

    debug!(path = %path.display(), "loading config file");
    parse(&std::fs::read_to_string(&path)?, &path)
}

fn parse(text: &str, path: &Path) -> Result<ConfigFile> {
    toml::from_str(text)
        .map_err(|e| ScanwerkError::Config(format!("{}: {e}", path.display())))
}

/// `$XDG_CONFIG_HOME/scanwerk/config.toml`, falling back to
/// `~/.config/scanwerk/config.toml`.
fn default_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("scanwerk").join("config.toml"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("scanwerk").join("config.toml"))
}
