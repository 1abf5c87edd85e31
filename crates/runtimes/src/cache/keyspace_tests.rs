// SPDX-License-Identifier: MIT

use super::*;
use crate::cache::value::Value;

#[test]
fn set_then_get_round_trips() {
    let mut ks = Keyspace::new(None, EvictionPolicy::NoEviction);
    ks.set(b"k".to_vec(), Value::Str(b"v".to_vec()), None, 0);
    match ks.get(b"k", 0) {
        Some(Value::Str(v)) => assert_eq!(v, b"v"),
        other => panic!("expected Str, got {other:?}"),
    }
}

#[test]
fn expired_key_is_lazily_removed_on_access() {
    let mut ks = Keyspace::new(None, EvictionPolicy::NoEviction);
    ks.set(b"k".to_vec(), Value::Str(b"v".to_vec()), Some(100), 0);
    assert!(ks.get(b"k", 50).is_some());
    assert!(ks.get(b"k", 150).is_none());
    assert_eq!(ks.len(), 0);
}

#[test]
fn del_removes_a_present_key_and_reports_absence() {
    let mut ks = Keyspace::new(None, EvictionPolicy::NoEviction);
    ks.set(b"k".to_vec(), Value::Str(b"v".to_vec()), None, 0);
    assert!(ks.del(b"k"));
    assert!(!ks.del(b"k"));
}

#[test]
fn ttl_reports_remaining_millis_and_persist_clears_it() {
    let mut ks = Keyspace::new(None, EvictionPolicy::NoEviction);
    ks.set(b"k".to_vec(), Value::Str(b"v".to_vec()), Some(1000), 0);
    assert_eq!(ks.ttl_ms(b"k", 200), Some(Some(800)));
    assert!(ks.persist(b"k"));
    assert_eq!(ks.ttl_ms(b"k", 200), Some(None));
}

#[test]
fn allkeys_lru_evicts_the_least_recently_used_entry_first() {
    let mut ks = Keyspace::new(Some(200), EvictionPolicy::AllKeysLru);
    ks.set(b"a".to_vec(), Value::Str(vec![0u8; 40]), None, 0);
    ks.set(b"b".to_vec(), Value::Str(vec![0u8; 40]), None, 0);
    // touch "a" so "b" becomes the LRU victim
    assert!(ks.get(b"a", 0).is_some());
    ks.set(b"c".to_vec(), Value::Str(vec![0u8; 80]), None, 0);
    assert!(ks.get(b"a", 0).is_some(), "recently-touched key should survive eviction");
    assert!(ks.get(b"b", 0).is_none(), "least-recently-used key should be evicted");
    assert!(ks.evicted_count >= 1);
}

#[test]
fn noeviction_rejects_writes_past_max_memory() {
    let mut ks = Keyspace::new(Some(60), EvictionPolicy::NoEviction);
    assert!(ks.set(b"a".to_vec(), Value::Str(vec![0u8; 8]), None, 0));
    assert!(!ks.set(b"b".to_vec(), Value::Str(vec![0u8; 8]), None, 0));
    assert_eq!(ks.rejected_writes, 1);
}

#[test]
fn sample_expire_removes_due_keys_without_a_direct_access() {
    let mut ks = Keyspace::new(None, EvictionPolicy::NoEviction);
    ks.set(b"a".to_vec(), Value::Str(b"v".to_vec()), Some(10), 0);
    ks.set(b"b".to_vec(), Value::Str(b"v".to_vec()), None, 0);
    let expired = ks.sample_expire(20, 50);
    assert_eq!(expired, 1);
    assert_eq!(ks.len(), 1);
}

#[test]
fn with_value_mut_reconciles_memory_accounting() {
    let mut ks = Keyspace::new(None, EvictionPolicy::NoEviction);
    ks.set(b"list".to_vec(), Value::List(Default::default()), None, 0);
    let before = ks.memory_used();
    ks.with_value_mut(b"list", 0, |v| {
        if let Value::List(l) = v {
            l.push_back(vec![0u8; 100]);
        }
    });
    assert!(ks.memory_used() > before);
}
