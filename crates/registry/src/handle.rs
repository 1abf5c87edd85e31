// SPDX-License-Identifier: MIT

//! The seam between `sk-registry` and `sk-runtimes`: the registry owns
//! lifecycle and lookup, a concrete runtime kind (in `sk-runtimes`)
//! owns everything behind this trait. Keeping the dependency this
//! direction (registry never depends on runtimes) avoids a cycle.

use sk_core::RuntimeStatsSnapshot;

/// A live, running runtime, as the registry sees it.
pub trait RuntimeHandle {
    /// Release every reactor resource and connection this runtime
    /// owns. Called outside the registry's lock — callers must not
    /// hold the lock across a reactor submission.
    fn teardown(&mut self);

    fn stats(&self) -> RuntimeStatsSnapshot;

    /// Current number of open connections, for `ls`/`ps`.
    fn connection_count(&self) -> usize;

    /// Deliver a pub/sub publication to this runtime's extension VM,
    /// if it has a matching subscription. Returns whether it was
    /// delivered.
    fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool;
}
