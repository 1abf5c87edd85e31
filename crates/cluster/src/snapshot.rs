// SPDX-License-Identifier: MIT

//! The per-daemon snapshot file: `<dir>/<daemon>.json`, written
//! atomically every 2s. Crash-safety follows the same tmp+fsync+rename
//! discipline as `sk_registry::persistence`, reused rather than
//! reinvented.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One runtime's contribution to this daemon's cluster snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub group: Option<String>,
    pub port: u16,
    pub state: String,
    pub connections: u64,
}

/// What one daemon publishes about itself every tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonSnapshot {
    pub daemon: String,
    pub host: String,
    pub heartbeat: u64,
    pub runtimes: Vec<RuntimeSnapshot>,
}

impl DaemonSnapshot {
    /// `true` if this snapshot's heartbeat is within the 10s staleness
    /// window as of `now_unix_secs`.
    pub fn is_fresh(&self, now_unix_secs: u64) -> bool {
        now_unix_secs.saturating_sub(self.heartbeat) < 10
    }

    pub fn group_counts(&self) -> std::collections::BTreeMap<String, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for runtime in &self.runtimes {
            if let Some(group) = &runtime.group {
                *counts.entry(group.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

fn snapshot_path(cluster_dir: &Path, daemon: &str) -> PathBuf {
    cluster_dir.join(format!("{daemon}.json"))
}

/// Write this daemon's snapshot atomically to
/// `<dir>/<this-daemon>.json`. `.tmp` siblings are ignored during scan.
pub fn write(cluster_dir: &Path, snapshot: &DaemonSnapshot) -> Result<()> {
    fs::create_dir_all(cluster_dir)?;
    let final_path = snapshot_path(cluster_dir, &snapshot.daemon);
    let tmp_path = final_path.with_extension("json.tmp");

    let body = serde_json::to_string_pretty(snapshot).map_err(crate::error::ClusterError::CorruptSnapshot)?;
    let mut file = File::create(&tmp_path)?;
    file.write_all(body.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

/// Scan `cluster_dir` for every sibling `<daemon>.json` file, skipping
/// `.tmp` siblings and `self_name`'s own snapshot.
pub fn scan_peers(cluster_dir: &Path, self_name: &str) -> Result<Vec<DaemonSnapshot>> {
    let mut out = Vec::new();
    let entries = match fs::read_dir(cluster_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        if stem == self_name {
            continue;
        }
        let body = fs::read_to_string(&path)?;
        match serde_json::from_str::<DaemonSnapshot>(&body) {
            Ok(snapshot) => out.push(snapshot),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping malformed peer snapshot");
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
