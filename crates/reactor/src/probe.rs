// SPDX-License-Identifier: MIT

//! Capability probe: at init the reactor asks the kernel for the
//! opcodes it supports and exposes boolean getters so runtimes can
//! degrade gracefully instead of submitting an SQE the kernel rejects.

use io_uring::register::Probe;
use io_uring::{opcode, IoUring};

#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    multishot_accept: bool,
    multishot_recv: bool,
    zero_copy_send: bool,
    direct_descriptor_accept: bool,
    submission_polling: bool,
}

impl Capabilities {
    pub fn probe(ring: &IoUring) -> Self {
        let probe = {
            let mut probe = Probe::new();
            ring.submitter().register_probe(&mut probe).ok().map(|()| probe)
        };
        let supports = |opcode: u8| {
            probe.as_ref().map(|p| p.is_supported(opcode)).unwrap_or(false)
        };
        Self {
            multishot_accept: supports(opcode::AcceptMulti::CODE),
            multishot_recv: supports(opcode::RecvMulti::CODE),
            zero_copy_send: supports(opcode::SendZc::CODE),
            direct_descriptor_accept: supports(opcode::Accept::CODE),
            submission_polling: false,
        }
    }

    pub fn multishot_accept(&self) -> bool {
        self.multishot_accept
    }

    pub fn multishot_recv(&self) -> bool {
        self.multishot_recv
    }

    pub fn zero_copy_send(&self) -> bool {
        self.zero_copy_send
    }

    pub fn direct_descriptor_accept(&self) -> bool {
        self.direct_descriptor_accept
    }

    pub fn submission_polling(&self) -> bool {
        self.submission_polling
    }
}
