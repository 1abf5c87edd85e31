// SPDX-License-Identifier: MIT

//! The cache keyspace: a slab of nodes threaded into an intrusive
//! doubly-linked list for LRU order, indexed by key for O(1) lookup.
//! Every read/write moves its node to the MRU end; the eviction policy
//! pops from the LRU end.
//!
//! The slab shape mirrors `sk_reactor::RequestRecords` (free-list over
//! a `Vec<Option<T>>`), adapted here to also carry prev/next links for
//! the LRU chain instead of a completion handler.

use std::collections::HashMap;

use super::value::{entry_overhead, Value};

struct Node {
    key: Vec<u8>,
    value: Value,
    expires_at_ms: Option<u64>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    NoEviction,
    AllKeysLru,
    AllKeysRandom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    ReadWrite,
    ReadOnly,
    Admin,
}

pub struct Keyspace {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<Vec<u8>, usize>,
    mru: Option<usize>,
    lru: Option<usize>,
    memory_used: usize,
    pub max_memory: Option<usize>,
    pub eviction: EvictionPolicy,
    pub evicted_count: u64,
    pub rejected_writes: u64,
}

impl Keyspace {
    pub fn new(max_memory: Option<usize>, eviction: EvictionPolicy) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            mru: None,
            lru: None,
            memory_used: 0,
            max_memory,
            eviction,
            evicted_count: 0,
            rejected_writes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Unlinks `idx` from the LRU chain. A no-op if the slot is empty —
    /// every call site holds a just-resolved index, so this should
    /// never happen, but the slab stays consistent either way.
    fn unlink(&mut self, idx: usize) {
        let Some((prev, next)) = self.nodes.get(idx).and_then(|n| n.as_ref()).map(|n| (n.prev, n.next)) else {
            return;
        };
        match prev {
            Some(p) => {
                if let Some(Some(node)) = self.nodes.get_mut(p) {
                    node.next = next;
                }
            }
            None => self.mru = next,
        }
        match next {
            Some(n) => {
                if let Some(Some(node)) = self.nodes.get_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.lru = prev,
        }
    }

    fn push_mru(&mut self, idx: usize) {
        let old_mru = self.mru;
        if let Some(Some(node)) = self.nodes.get_mut(idx) {
            node.prev = None;
            node.next = old_mru;
        }
        if let Some(old) = old_mru {
            if let Some(Some(node)) = self.nodes.get_mut(old) {
                node.prev = Some(idx);
            }
        }
        self.mru = Some(idx);
        if self.lru.is_none() {
            self.lru = Some(idx);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.mru == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_mru(idx);
    }

    /// Removes the node at `idx`. Returns `None` if the slot was
    /// already empty (should not happen for a valid index).
    fn remove_index(&mut self, idx: usize) -> Option<Node> {
        self.unlink(idx);
        let node = self.nodes.get_mut(idx).and_then(|slot| slot.take())?;
        self.free.push(idx);
        self.index.remove(&node.key);
        self.memory_used = self.memory_used.saturating_sub(node.value.size_bytes() + entry_overhead(&node.key));
        Some(node)
    }

    fn insert_new(&mut self, key: Vec<u8>, value: Value, expires_at_ms: Option<u64>) -> usize {
        let size = value.size_bytes() + entry_overhead(&key);
        let node = Node { key: key.clone(), value, expires_at_ms, prev: None, next: None };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.memory_used += size;
        self.push_mru(idx);
        idx
    }

    fn expire_if_due(&mut self, idx: usize, now_ms: u64) -> bool {
        let expired = matches!(self.nodes[idx].as_ref().map(|n| n.expires_at_ms), Some(Some(at)) if at <= now_ms);
        if expired {
            self.remove_index(idx);
        }
        expired
    }

    /// Lazy expiry and LRU touch, evaluated on lookup.
    fn resolve(&mut self, key: &[u8], now_ms: u64) -> Option<usize> {
        let idx = *self.index.get(key)?;
        if self.expire_if_due(idx, now_ms) {
            return None;
        }
        self.touch(idx);
        Some(idx)
    }

    pub fn get(&mut self, key: &[u8], now_ms: u64) -> Option<&Value> {
        let idx = self.resolve(key, now_ms)?;
        self.nodes.get(idx).and_then(|n| n.as_ref()).map(|n| &n.value)
    }

    /// Returns `false` (rejected) if `max_memory` would be exceeded and
    /// the policy is `NoEviction`.
    pub fn set(&mut self, key: Vec<u8>, value: Value, ttl_ms: Option<u64>, now_ms: u64) -> bool {
        if let Some(idx) = self.index.get(&key).copied() {
            self.remove_index(idx);
        }
        let expires_at_ms = ttl_ms.map(|ttl| now_ms + ttl);
        let incoming_size = value.size_bytes() + entry_overhead(&key);
        if !self.make_room_for(incoming_size) {
            self.rejected_writes += 1;
            return false;
        }
        self.insert_new(key, value, expires_at_ms);
        true
    }

    pub fn del(&mut self, key: &[u8]) -> bool {
        match self.index.get(key).copied() {
            Some(idx) => {
                self.remove_index(idx);
                true
            }
            None => false,
        }
    }

    pub fn expire(&mut self, key: &[u8], ttl_ms: u64, now_ms: u64) -> bool {
        let Some(idx) = self.index.get(key).copied() else { return false };
        let Some(Some(node)) = self.nodes.get_mut(idx) else { return false };
        node.expires_at_ms = Some(now_ms + ttl_ms);
        true
    }

    /// `None` = no such key; `Some(None)` = key exists with no TTL.
    pub fn ttl_ms(&mut self, key: &[u8], now_ms: u64) -> Option<Option<u64>> {
        let idx = self.resolve(key, now_ms)?;
        let node = self.nodes.get(idx)?.as_ref()?;
        Some(node.expires_at_ms.map(|at| at.saturating_sub(now_ms)))
    }

    pub fn persist(&mut self, key: &[u8]) -> bool {
        let Some(idx) = self.index.get(key).copied() else { return false };
        let Some(Some(node)) = self.nodes.get_mut(idx) else { return false };
        node.expires_at_ms.take().is_some()
    }

    /// Mutates the value in place via `f`, touching LRU order, without
    /// re-deriving the memory-accounting delta up front (list/set/hash
    /// ops resize in small increments; the size delta is reconciled
    /// against the running total after `f` runs).
    pub fn with_value_mut<R>(&mut self, key: &[u8], now_ms: u64, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let idx = self.resolve(key, now_ms)?;
        let node = self.nodes.get_mut(idx)?.as_mut()?;
        let before = node.value.size_bytes();
        let result = f(&mut node.value);
        let after = node.value.size_bytes();
        self.memory_used = self.memory_used + after - before;
        Some(result)
    }

    pub fn get_or_insert_with(&mut self, key: &[u8], now_ms: u64, default: impl FnOnce() -> Value) -> Option<&mut Value> {
        if self.resolve(key, now_ms).is_none() {
            self.insert_new(key.to_vec(), default(), None);
        }
        let idx = *self.index.get(key)?;
        self.nodes.get_mut(idx)?.as_mut().map(|n| &mut n.value)
    }

    /// Active expiry sampler, run on a fixed interval from the caller
    /// with a bounded sample size per pass.
    pub fn sample_expire(&mut self, sample_size: usize, now_ms: u64) -> usize {
        let candidates: Vec<usize> = self.index.values().take(sample_size).copied().collect();
        let mut expired = 0;
        for idx in candidates {
            if self.expire_if_due(idx, now_ms) {
                expired += 1;
            }
        }
        expired
    }

    fn make_room_for(&mut self, incoming_size: usize) -> bool {
        let Some(max) = self.max_memory else { return true };
        if self.memory_used + incoming_size <= max {
            return true;
        }
        if self.eviction == EvictionPolicy::NoEviction {
            return false;
        }
        while self.memory_used + incoming_size > max {
            let victim = match self.eviction {
                EvictionPolicy::AllKeysLru => self.lru,
                EvictionPolicy::AllKeysRandom => self.index.values().next().copied(),
                EvictionPolicy::NoEviction => None,
            };
            match victim {
                Some(idx) => {
                    self.remove_index(idx);
                    self.evicted_count += 1;
                }
                None => break,
            }
        }
        self.memory_used + incoming_size <= max
    }

    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    /// Every live entry, for admin inspection/dump commands. Clones
    /// values — acceptable for an operator-invoked, infrequent op.
    pub fn entries(&self) -> Vec<(Vec<u8>, Value, Option<u64>)> {
        self.nodes.iter().flatten().map(|n| (n.key.clone(), n.value.clone(), n.expires_at_ms)).collect()
    }
}

#[cfg(test)]
#[path = "keyspace_tests.rs"]
mod tests;
