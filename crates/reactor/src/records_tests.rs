// SPDX-License-Identifier: MIT

use super::*;
use std::cell::RefCell;
use std::rc::Rc;

struct Probe(Rc<RefCell<Vec<i32>>>);

impl Completion for Probe {
    fn on_completion(self: Box<Self>, _reactor: &mut Reactor, result: i32, _flags: u32) {
        self.0.borrow_mut().push(result);
    }
}

#[test]
fn insert_then_take_round_trips_the_same_slot() {
    let mut records = RequestRecords::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let token = records.insert(Box::new(Probe(log.clone())));
    assert!(records.take(token).is_some());
}

#[test]
fn take_twice_returns_none_the_second_time() {
    let mut records = RequestRecords::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let token = records.insert(Box::new(Probe(log)));
    records.take(token).unwrap();
    assert!(records.take(token).is_none());
}

#[test]
fn freed_slot_is_reused_with_a_bumped_generation() {
    let mut records = RequestRecords::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let first = records.insert(Box::new(Probe(log.clone())));
    records.free(first);
    let second = records.insert(Box::new(Probe(log)));
    assert_ne!(first.as_u64(), second.as_u64());
    assert_eq!(first.index(), second.index());
}

#[test]
fn stale_token_after_free_does_not_resolve() {
    let mut records = RequestRecords::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let stale = records.insert(Box::new(Probe(log.clone())));
    records.free(stale);
    let _fresh = records.insert(Box::new(Probe(log)));
    assert!(records.take(stale).is_none());
}

#[test]
fn reinsert_keeps_a_multishot_token_alive_across_completions() {
    let mut records = RequestRecords::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let token = records.insert(Box::new(Probe(log.clone())));
    let handler = records.take(token).unwrap();
    records.reinsert(token, handler);
    assert!(records.take(token).is_some());
}
