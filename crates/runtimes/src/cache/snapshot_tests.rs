// SPDX-License-Identifier: MIT

use super::*;
use std::collections::{HashMap, HashSet, VecDeque};
use tempfile::tempdir;

#[test]
fn round_trips_every_value_kind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dump.skcs");
    let mut list = VecDeque::new();
    list.push_back(b"x".to_vec());
    let mut set = HashSet::new();
    set.insert(b"member".to_vec());
    let mut hash = HashMap::new();
    hash.insert(b"field".to_vec(), b"value".to_vec());

    let entries = vec![
        SnapshotEntry { key: b"s".to_vec(), value: Value::Str(b"hello".to_vec()), expires_at_ms: None },
        SnapshotEntry { key: b"l".to_vec(), value: Value::List(list), expires_at_ms: Some(123) },
        SnapshotEntry { key: b"st".to_vec(), value: Value::Set(set), expires_at_ms: None },
        SnapshotEntry { key: b"h".to_vec(), value: Value::Hash(hash), expires_at_ms: None },
    ];
    save(&path, &entries).unwrap();
    let loaded = load(&path).unwrap();
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded[1].expires_at_ms, Some(123));
}

#[test]
fn rejects_a_bad_magic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dump.skcs");
    std::fs::write(&path, b"NOPE garbage").unwrap();
    assert!(load(&path).is_err());
}

#[test]
fn rejects_an_unknown_version() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dump.skcs");
    let mut body = Vec::new();
    body.extend_from_slice(MAGIC);
    body.extend_from_slice(&99u32.to_le_bytes());
    std::fs::write(&path, &body).unwrap();
    assert!(load(&path).is_err());
}

#[test]
fn save_leaves_no_tmp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dump.skcs");
    save(&path, &[]).unwrap();
    assert!(!dir.path().join("dump.tmp").exists());
}
