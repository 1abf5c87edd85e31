// SPDX-License-Identifier: MIT

//! Crash-safe config persistence: one pretty-printed JSON file per
//! runtime, written via tmp+fsync+rename.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sk_core::RuntimeName;

use crate::config::RuntimeConfig;
use crate::error::{RegistryError, Result};

fn config_path(state_dir: &Path, name: &RuntimeName) -> PathBuf {
    state_dir.join(format!("{}.json", name.as_str()))
}

/// Write `config` for `name`, replacing any previous file atomically.
pub fn save(state_dir: &Path, name: &RuntimeName, config: &RuntimeConfig) -> Result<()> {
    fs::create_dir_all(state_dir).map_err(|e| persist_err(name, e))?;
    let final_path = config_path(state_dir, name);
    let tmp_path = final_path.with_extension("tmp");

    let body = serde_json::to_string_pretty(config)?;
    let mut file = File::create(&tmp_path).map_err(|e| persist_err(name, e))?;
    file.write_all(body.as_bytes()).map_err(|e| persist_err(name, e))?;
    file.sync_all().map_err(|e| persist_err(name, e))?;
    fs::rename(&tmp_path, &final_path).map_err(|e| persist_err(name, e))?;
    Ok(())
}

pub fn load(state_dir: &Path, name: &RuntimeName) -> Result<RuntimeConfig> {
    let body = fs::read_to_string(config_path(state_dir, name)).map_err(|e| persist_err(name, e))?;
    Ok(serde_json::from_str(&body)?)
}

pub fn delete(state_dir: &Path, name: &RuntimeName) -> Result<()> {
    let path = config_path(state_dir, name);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(persist_err(name, e)),
    }
}

/// Replay every `*.json` config in `state_dir` at startup, for the
/// daemon's reconcile step — restart honors each runtime's
/// `was_running` flag.
pub fn replay_all(state_dir: &Path) -> Result<Vec<(RuntimeName, RuntimeConfig)>> {
    let mut out = Vec::new();
    let entries = match fs::read_dir(state_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(RegistryError::Persistence { name: state_dir.display().to_string(), source: e }),
    };
    for entry in entries {
        let entry = entry.map_err(|e| RegistryError::Persistence { name: state_dir.display().to_string(), source: e })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        let Some(name) = RuntimeName::parse(stem).ok() else {
            tracing::warn!(file = %path.display(), "skipping config file with an invalid runtime name");
            continue;
        };
        let config = load(state_dir, &name)?;
        out.push((name, config));
    }
    Ok(out)
}

fn persist_err(name: &RuntimeName, source: std::io::Error) -> RegistryError {
    RegistryError::Persistence { name: name.as_str().to_string(), source }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
