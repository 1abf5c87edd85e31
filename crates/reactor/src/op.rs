// SPDX-License-Identifier: MIT

//! Typed submission primitives. Each constructor builds the
//! corresponding `io_uring` SQE; `Reactor::submit` stamps in the
//! request's token as `user_data` and pushes it onto the ring.

use std::net::SocketAddr;
use std::os::fd::RawFd;

use io_uring::{opcode, squeue, types};

/// An absolute kernel timespec. `io_uring` timeout SQEs need one
/// rather than a relative duration so re-arming a timer doesn't drift
/// by however long the previous completion took to process.
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteTimespec {
    pub secs: i64,
    pub nanos: i64,
}

impl From<AbsoluteTimespec> for types::Timespec {
    fn from(ts: AbsoluteTimespec) -> Self {
        types::Timespec::new().sec(ts.secs as u64).nsec(ts.nanos as u32)
    }
}

pub(crate) fn accept_oneshot(fd: RawFd) -> squeue::Entry {
    opcode::Accept::new(types::Fd(fd), std::ptr::null_mut(), std::ptr::null_mut()).build()
}

pub(crate) fn accept_multishot(fd: RawFd) -> squeue::Entry {
    opcode::AcceptMulti::new(types::Fd(fd)).build()
}

pub(crate) fn accept_direct(fd: RawFd) -> squeue::Entry {
    opcode::Accept::new(types::Fd(fd), std::ptr::null_mut(), std::ptr::null_mut())
        .file_index(Some(types::DestinationSlot::auto_target()))
        .build()
}

pub(crate) fn read(fd: RawFd, buf: &mut [u8]) -> squeue::Entry {
    opcode::Read::new(types::Fd(fd), buf.as_mut_ptr(), buf.len() as u32).build()
}

pub(crate) fn read_fixed(slot: u32, buf: &mut [u8]) -> squeue::Entry {
    opcode::Read::new(types::Fixed(slot), buf.as_mut_ptr(), buf.len() as u32).build()
}

pub(crate) fn read_provided(fd: RawFd, len: u32, buf_group: u16) -> squeue::Entry {
    opcode::Read::new(types::Fd(fd), std::ptr::null_mut(), len)
        .buf_group(buf_group)
        .build()
        .flags(squeue::Flags::BUFFER_SELECT)
}

pub(crate) fn write(fd: RawFd, buf: &[u8]) -> squeue::Entry {
    opcode::Write::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32).build()
}

pub(crate) fn write_fixed(slot: u32, buf: &[u8]) -> squeue::Entry {
    opcode::Write::new(types::Fixed(slot), buf.as_ptr(), buf.len() as u32).build()
}

pub(crate) fn writev(fd: RawFd, iovecs: &[libc::iovec]) -> squeue::Entry {
    opcode::Writev::new(types::Fd(fd), iovecs.as_ptr(), iovecs.len() as u32).build()
}

pub(crate) fn recvmsg(fd: RawFd, msghdr: *mut libc::msghdr) -> squeue::Entry {
    opcode::RecvMsg::new(types::Fd(fd), msghdr).build()
}

pub(crate) fn recv_multishot(fd: RawFd, buf_group: u16) -> squeue::Entry {
    opcode::RecvMulti::new(types::Fd(fd), buf_group).build()
}

pub(crate) fn timeout(ts: &types::Timespec) -> squeue::Entry {
    opcode::Timeout::new(ts as *const _).build()
}

pub(crate) fn splice(from: RawFd, to: RawFd, len: u32) -> squeue::Entry {
    opcode::Splice::new(types::Fd(from), -1, types::Fd(to), -1, len).build()
}

pub(crate) fn connect(fd: RawFd, addr: &SocketAddr) -> (squeue::Entry, Box<libc::sockaddr_storage>) {
    let (storage, len) = socket_addr_to_storage(addr);
    let boxed = Box::new(storage);
    let entry = opcode::Connect::new(types::Fd(fd), std::ptr::addr_of!(*boxed).cast(), len).build();
    (entry, boxed)
}

pub(crate) fn cancel_fd(fd: RawFd) -> squeue::Entry {
    opcode::AsyncCancel2::new(types::CancelBuilder::fd(types::Fd(fd))).build()
}

pub(crate) fn send_zc(fd: RawFd, buf: &[u8]) -> squeue::Entry {
    opcode::SendZc::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32).build()
}

fn socket_addr_to_storage(addr: &SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    // SAFETY: zeroed sockaddr_storage is a valid representation; the
    // caller only reads back the fields the matching sa_family implies.
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr { s_addr: u32::from_ne_bytes(v4.ip().octets()) },
                sin_zero: [0; 8],
            };
            unsafe { std::ptr::write(std::ptr::addr_of_mut!(storage).cast(), sin) };
            std::mem::size_of::<libc::sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr { s6_addr: v6.ip().octets() },
                sin6_scope_id: v6.scope_id(),
            };
            unsafe { std::ptr::write(std::ptr::addr_of_mut!(storage).cast(), sin6) };
            std::mem::size_of::<libc::sockaddr_in6>()
        }
    };
    (storage, len as libc::socklen_t)
}
