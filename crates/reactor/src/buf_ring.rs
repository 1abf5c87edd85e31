// SPDX-License-Identifier: MIT

//! Provided buffer rings: per 16-bit group id, a pool of fixed-size
//! buffers the kernel picks from for `read`/`recv`-provided submissions.
//! The completion reports which buffer id was consumed; callers must
//! return it (advance the ring) exactly once.

use std::collections::HashMap;

use crate::error::{ReactorError, Result};

pub struct BufferRing {
    group_id: u16,
    buf_len: usize,
    buffers: Vec<Box<[u8]>>,
    available: Vec<u16>,
}

impl BufferRing {
    fn new(group_id: u16, count: u16, buf_len: usize) -> Self {
        let buffers = (0..count).map(|_| vec![0u8; buf_len].into_boxed_slice()).collect();
        let available = (0..count).collect();
        Self { group_id, buf_len, buffers, available }
    }

    pub fn group_id(&self) -> u16 {
        self.group_id
    }

    pub fn buf_len(&self) -> usize {
        self.buf_len
    }

    /// Borrow the buffer the kernel selected for a completion, by id.
    pub fn buffer(&self, buf_id: u16) -> Option<&[u8]> {
        self.buffers.get(buf_id as usize).map(|b| &b[..])
    }

    pub fn buffer_mut(&mut self, buf_id: u16) -> Option<&mut [u8]> {
        self.buffers.get_mut(buf_id as usize).map(|b| &mut b[..])
    }

    /// Return a buffer to the ring so the kernel can reuse it. A handler
    /// that forgets to call this starves the group.
    pub fn recycle(&mut self, buf_id: u16) {
        self.available.push(buf_id);
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }
}

#[derive(Default)]
pub struct BufferRingRegistry {
    groups: HashMap<u16, BufferRing>,
}

impl BufferRingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, group_id: u16, count: u16, buf_len: usize) {
        self.groups.insert(group_id, BufferRing::new(group_id, count, buf_len));
    }

    pub fn get(&self, group_id: u16) -> Result<&BufferRing> {
        self.groups.get(&group_id).ok_or(ReactorError::UnknownBufferGroup(group_id))
    }

    pub fn get_mut(&mut self, group_id: u16) -> Result<&mut BufferRing> {
        self.groups.get_mut(&group_id).ok_or(ReactorError::UnknownBufferGroup(group_id))
    }
}

#[cfg(test)]
#[path = "buf_ring_tests.rs"]
mod tests;
