// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn register_then_lookup_returns_the_group() {
    let mut registry = BufferRingRegistry::new();
    registry.register(7, 16, 4096);
    let ring = registry.get(7).unwrap();
    assert_eq!(ring.group_id(), 7);
    assert_eq!(ring.buf_len(), 4096);
    assert_eq!(ring.available_count(), 16);
}

#[test]
fn unknown_group_is_an_error() {
    let registry = BufferRingRegistry::new();
    assert!(matches!(registry.get(1), Err(ReactorError::UnknownBufferGroup(1))));
}

#[test]
fn recycle_returns_a_buffer_to_the_available_pool() {
    let mut registry = BufferRingRegistry::new();
    registry.register(0, 2, 64);
    let ring = registry.get_mut(0).unwrap();
    ring.available.clear();
    ring.recycle(0);
    assert_eq!(ring.available_count(), 1);
}

#[test]
fn buffer_mut_allows_writing_into_the_backing_slab() {
    let mut registry = BufferRingRegistry::new();
    registry.register(0, 1, 8);
    let ring = registry.get_mut(0).unwrap();
    ring.buffer_mut(0).unwrap()[0] = 0xab;
    assert_eq!(ring.buffer(0).unwrap()[0], 0xab);
}
