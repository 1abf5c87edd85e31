// SPDX-License-Identifier: MIT

//! The tagged value variant stored per key.

use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub enum Value {
    Str(Vec<u8>),
    List(VecDeque<Vec<u8>>),
    Set(HashSet<Vec<u8>>),
    Hash(HashMap<Vec<u8>, Vec<u8>>),
}

/// Overhead constants per variant for exact memory accounting (spec
/// §4.6: "exact per-entry bytes"). Chosen to approximate a `Vec`/`HashMap`
/// header plus bucket overhead; the exact figures aren't load-bearing,
/// only their consistency across set/eviction accounting is.
const ENTRY_OVERHEAD: usize = 48;
const COLLECTION_ITEM_OVERHEAD: usize = 16;

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Hash(_) => "hash",
        }
    }

    /// Approximate resident size in bytes, for `max_memory` accounting.
    pub fn size_bytes(&self) -> usize {
        match self {
            Value::Str(s) => s.len(),
            Value::List(l) => l.iter().map(|v| v.len() + COLLECTION_ITEM_OVERHEAD).sum(),
            Value::Set(s) => s.iter().map(|v| v.len() + COLLECTION_ITEM_OVERHEAD).sum(),
            Value::Hash(h) => h.iter().map(|(k, v)| k.len() + v.len() + COLLECTION_ITEM_OVERHEAD).sum(),
        }
    }
}

pub fn entry_overhead(key: &[u8]) -> usize {
    key.len() + ENTRY_OVERHEAD
}
