// SPDX-License-Identifier: MIT

//! Versioned binary snapshot format: magic + version word, then
//! length-prefixed entries, all integers little-endian.
//! Written atomically via tmp+fsync+rename, the same discipline
//! `sk_registry::persistence` uses for config files.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{Result, RuntimeError};

use super::value::Value;

const MAGIC: &[u8; 4] = b"SKCS";
const VERSION: u32 = 1;

const TAG_STR: u8 = 0;
const TAG_LIST: u8 = 1;
const TAG_SET: u8 = 2;
const TAG_HASH: u8 = 3;

pub struct SnapshotEntry {
    pub key: Vec<u8>,
    pub value: Value,
    pub expires_at_ms: Option<u64>,
}

pub fn save(path: &Path, entries: &[SnapshotEntry]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut body = Vec::new();
    body.extend_from_slice(MAGIC);
    body.extend_from_slice(&VERSION.to_le_bytes());
    body.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for entry in entries {
        write_bytes(&mut body, &entry.key);
        write_value(&mut body, &entry.value);
        body.extend_from_slice(&entry.expires_at_ms.unwrap_or(0).to_le_bytes());
        body.push(u8::from(entry.expires_at_ms.is_some()));
    }

    let mut file = File::create(&tmp_path).map_err(io_err)?;
    file.write_all(&body).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<SnapshotEntry>> {
    let mut file = File::open(path).map_err(io_err)?;
    let mut body = Vec::new();
    file.read_to_end(&mut body).map_err(io_err)?;
    let mut cursor = Cursor { buf: &body, pos: 0 };

    let magic = cursor.take(4).ok_or_else(|| RuntimeError::Snapshot("truncated header".into()))?;
    if magic != MAGIC {
        return Err(RuntimeError::Snapshot("bad magic".into()));
    }
    let version = cursor.u32().ok_or_else(|| RuntimeError::Snapshot("truncated version".into()))?;
    if version != VERSION {
        return Err(RuntimeError::Snapshot(format!("unsupported snapshot version {version}")));
    }
    let count = cursor.u64().ok_or_else(|| RuntimeError::Snapshot("truncated count".into()))?;

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = cursor.bytes().ok_or_else(|| RuntimeError::Snapshot("truncated key".into()))?;
        let value = cursor.value().ok_or_else(|| RuntimeError::Snapshot("truncated value".into()))?;
        let raw_expiry = cursor.u64().ok_or_else(|| RuntimeError::Snapshot("truncated expiry".into()))?;
        let has_expiry = cursor.take(1).ok_or_else(|| RuntimeError::Snapshot("truncated expiry flag".into()))?;
        let expires_at_ms = if has_expiry[0] != 0 { Some(raw_expiry) } else { None };
        entries.push(SnapshotEntry { key, value, expires_at_ms });
    }
    Ok(entries)
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Str(s) => {
            out.push(TAG_STR);
            write_bytes(out, s);
        }
        Value::List(items) => {
            out.push(TAG_LIST);
            out.extend_from_slice(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_bytes(out, item);
            }
        }
        Value::Set(items) => {
            out.push(TAG_SET);
            out.extend_from_slice(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_bytes(out, item);
            }
        }
        Value::Hash(map) => {
            out.push(TAG_HASH);
            out.extend_from_slice(&(map.len() as u64).to_le_bytes());
            for (k, v) in map {
                write_bytes(out, k);
                write_bytes(out, v);
            }
        }
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let slice = self.buf.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        let raw = self.take(4)?;
        Some(u32::from_le_bytes(raw.try_into().ok()?))
    }

    fn u64(&mut self) -> Option<u64> {
        let raw = self.take(8)?;
        Some(u64::from_le_bytes(raw.try_into().ok()?))
    }

    fn bytes(&mut self) -> Option<Vec<u8>> {
        let len = self.u64()? as usize;
        Some(self.take(len)?.to_vec())
    }

    fn value(&mut self) -> Option<Value> {
        let tag = self.take(1)?[0];
        match tag {
            TAG_STR => Some(Value::Str(self.bytes()?)),
            TAG_LIST => {
                let count = self.u64()?;
                let mut items = std::collections::VecDeque::with_capacity(count as usize);
                for _ in 0..count {
                    items.push_back(self.bytes()?);
                }
                Some(Value::List(items))
            }
            TAG_SET => {
                let count = self.u64()?;
                let mut items = std::collections::HashSet::with_capacity(count as usize);
                for _ in 0..count {
                    items.insert(self.bytes()?);
                }
                Some(Value::Set(items))
            }
            TAG_HASH => {
                let count = self.u64()?;
                let mut map = std::collections::HashMap::with_capacity(count as usize);
                for _ in 0..count {
                    let k = self.bytes()?;
                    let v = self.bytes()?;
                    map.insert(k, v);
                }
                Some(Value::Hash(map))
            }
            _ => None,
        }
    }
}

fn io_err(e: io::Error) -> RuntimeError {
    RuntimeError::Snapshot(e.to_string())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
