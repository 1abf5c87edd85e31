// SPDX-License-Identifier: MIT

//! The completion-based event loop. One `Reactor` runs on its own
//! dedicated thread; every runtime callback, completion handler, and
//! extension-VM invocation executes there.

use io_uring::{IoUring, squeue};
use tracing::{debug, warn};

use crate::buf_ring::BufferRingRegistry;
use crate::error::{ReactorError, Result};
use crate::fixed_table::FixedTable;
use crate::op::{self, AbsoluteTimespec};
use crate::probe::Capabilities;
use crate::records::{Completion, RequestRecords, Token};
use crate::signal::SignalPipe;

const DEFAULT_QUEUE_DEPTH: u32 = 2048;

struct StopSentinel;

impl Completion for StopSentinel {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, _result: i32, _flags: u32) {
        reactor.stopping = true;
    }
}

/// Owns the `io_uring` instance and every piece of shared reactor state
/// a runtime's completion handlers are allowed to touch.
pub struct Reactor {
    ring: IoUring,
    records: RequestRecords,
    fixed: FixedTable,
    buffers: BufferRingRegistry,
    capabilities: Capabilities,
    signal: SignalPipe,
    signal_token: Option<Token>,
    stopping: bool,
}

impl Reactor {
    /// Build the ring, probing for the richest setup the kernel accepts
    /// and falling back progressively.
    pub fn init(queue_depth: Option<u32>) -> Result<Self> {
        let depth = queue_depth.unwrap_or(DEFAULT_QUEUE_DEPTH);
        let ring = Self::build_ring(depth)?;
        let capabilities = Capabilities::probe(&ring);
        let signal = SignalPipe::new()?;

        let mut reactor = Self {
            ring,
            records: RequestRecords::new(),
            fixed: FixedTable::new(),
            buffers: BufferRingRegistry::new(),
            capabilities,
            signal,
            signal_token: None,
            stopping: false,
        };
        reactor.arm_signal_pipe()?;
        Ok(reactor)
    }

    fn build_ring(depth: u32) -> Result<IoUring> {
        IoUring::builder()
            .setup_single_issuer()
            .build(depth)
            .or_else(|_| IoUring::builder().build(depth))
            .map_err(ReactorError::Setup)
    }

    fn arm_signal_pipe(&mut self) -> Result<()> {
        let fd = self.signal.read_fd();
        // Leaked for the reactor's lifetime: the read completes exactly
        // once, right before the loop exits, so there is no pool to return it to.
        let scratch: &'static mut [u8; 1] = Box::leak(Box::new([0u8; 1]));
        let entry = op::read(fd, scratch.as_mut_slice());
        let token = self.records.insert(Box::new(StopSentinel));
        self.signal_token = Some(token);
        self.push(entry.user_data(token.as_u64()))
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn alloc_fixed_slot(&mut self) -> Result<u32> {
        self.fixed.alloc_slot()
    }

    pub fn free_fixed_slot(&mut self, slot: u32) {
        self.fixed.free_slot(slot);
    }

    pub fn register_buffer_group(&mut self, group_id: u16, count: u16, buf_len: usize) {
        self.buffers.register(group_id, count, buf_len);
    }

    pub fn buffers(&self) -> &BufferRingRegistry {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut BufferRingRegistry {
        &mut self.buffers
    }

    /// Register a completion handler and submit its SQE, stamping in
    /// the generation-tagged token as `user_data`.
    pub fn submit(&mut self, entry: squeue::Entry, completion: Box<dyn Completion>) -> Result<Token> {
        let token = self.records.insert(completion);
        self.push(entry.user_data(token.as_u64()))?;
        Ok(token)
    }

    fn push(&mut self, entry: squeue::Entry) -> Result<()> {
        // SAFETY: the buffers/fds referenced by `entry` outlive the
        // in-flight submission; callers keep them alive via the boxed
        // `Completion` stored in `records` until the CQE arrives.
        let full = unsafe { self.ring.submission().push(&entry) }.is_err();
        if full {
            self.flush()?;
            // SAFETY: see above.
            if unsafe { self.ring.submission().push(&entry) }.is_err() {
                return Err(ReactorError::SubmissionDropped);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ring.submit().map_err(ReactorError::Setup)?;
        Ok(())
    }

    pub fn submit_accept(&mut self, fd: std::os::fd::RawFd, completion: Box<dyn Completion>) -> Result<Token> {
        let entry = if self.capabilities.multishot_accept() {
            op::accept_multishot(fd)
        } else {
            op::accept_oneshot(fd)
        };
        self.submit(entry, completion)
    }

    pub fn submit_timeout(&mut self, at: AbsoluteTimespec, completion: Box<dyn Completion>) -> Result<Token> {
        let ts: io_uring::types::Timespec = at.into();
        let entry = op::timeout(&ts);
        self.submit(entry, completion)
    }

    /// Submit a plain read against a raw fd. The caller's `Completion`
    /// must keep the backing buffer alive until the CQE arrives.
    pub fn submit_read(&mut self, fd: std::os::fd::RawFd, buf: &mut [u8], completion: Box<dyn Completion>) -> Result<Token> {
        self.submit(op::read(fd, buf), completion)
    }

    /// Submit a provided-buffer read: the kernel picks a buffer out of
    /// `group_id`'s ring and reports which one it used in the CQE flags.
    pub fn submit_read_provided(
        &mut self,
        fd: std::os::fd::RawFd,
        len: u32,
        group_id: u16,
        completion: Box<dyn Completion>,
    ) -> Result<Token> {
        self.submit(op::read_provided(fd, len, group_id), completion)
    }

    pub fn submit_write(&mut self, fd: std::os::fd::RawFd, buf: &[u8], completion: Box<dyn Completion>) -> Result<Token> {
        self.submit(op::write(fd, buf), completion)
    }

    /// Submit an async connect. The sockaddr storage is boxed and handed
    /// back so the caller's `Completion` can keep it alive alongside the fd.
    pub fn submit_connect(
        &mut self,
        fd: std::os::fd::RawFd,
        addr: &std::net::SocketAddr,
        completion: Box<dyn Completion>,
    ) -> Result<(Token, Box<libc::sockaddr_storage>)> {
        let (entry, storage) = op::connect(fd, addr);
        let token = self.submit(entry, completion)?;
        Ok((token, storage))
    }

    /// Re-arm a multishot completion under its existing token. A
    /// multishot accept/recv handler calls this from `on_completion`
    /// whenever the CQE's `more` flag says another completion is
    /// coming on the same submission.
    pub fn reinsert(&mut self, token: Token, completion: Box<dyn Completion>) {
        self.records.reinsert(token, completion);
    }

    pub fn submit_cancel(&mut self, fd: std::os::fd::RawFd) -> Result<()> {
        let entry = op::cancel_fd(fd);
        self.push(entry.user_data(u64::MAX))
    }

    pub fn request_stop(&mut self) -> Result<()> {
        self.signal.wake()
    }

    /// Drive the loop until `request_stop()` fires. Each pass flushes
    /// whatever was queued since the last one, blocks for at least
    /// one completion, then drains every completion that's ready.
    pub fn run(&mut self) -> Result<()> {
        while !self.stopping {
            self.tick()?;
        }
        debug!("reactor loop exiting after stop signal");
        Ok(())
    }

    /// One flush/submit-and-wait/drain pass, for callers that need to
    /// interleave their own work (e.g. draining a command channel)
    /// between batches instead of calling [`Reactor::run`] directly.
    pub fn tick(&mut self) -> Result<()> {
        self.flush()?;
        self.ring.submit_and_wait(1).map_err(ReactorError::Setup)?;
        self.drain_completions();
        Ok(())
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    fn drain_completions(&mut self) {
        let mut completed = Vec::new();
        {
            let mut cq = self.ring.completion();
            cq.sync();
            for cqe in &mut cq {
                completed.push((Token::from_u64(cqe.user_data()), cqe.result(), cqe.flags()));
            }
        }
        for (token, result, flags) in completed {
            if token.as_u64() == u64::MAX {
                continue; // bare cancel, no registered handler
            }
            match self.records.take(token) {
                Some(handler) => handler.on_completion(self, result, flags),
                None => warn!("dropped completion for a stale or unknown request record"),
            }
        }
    }
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod tests;
