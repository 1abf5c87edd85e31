// SPDX-License-Identifier: MIT

//! Raw socket helpers shared by the per-kind drivers: binding a
//! listening socket, accepting/closing with the cancel-before-close
//! discipline `io_uring` requires — a fd closed while a submission
//! still references it is undefined behavior, not just a leak.

use std::net::SocketAddr;
use std::os::fd::RawFd;

use sk_reactor::ReactorError;

/// Read-buffer size for per-connection owned-buffer reads.
pub const BUF_GROUP_LEN: usize = 4096;

/// Bind and listen a non-blocking TCP socket on `port`, for the
/// reactor to submit a multishot accept against.
pub fn bind_listener(port: u16) -> Result<RawFd, ReactorError> {
    // SAFETY: standard socket/bind/listen sequence; each call is
    // checked and mapped to an `io::Error` on failure.
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM | libc::SOCK_NONBLOCK, 0);
        if fd < 0 {
            return Err(ReactorError::Setup(std::io::Error::last_os_error()));
        }
        let optval: libc::c_int = 1;
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            std::ptr::addr_of!(optval).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let (storage, len) = sockaddr_in(&addr);
        let rc = libc::bind(fd, std::ptr::addr_of!(storage).cast(), len);
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(ReactorError::Setup(err));
        }
        let rc = libc::listen(fd, 1024);
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(ReactorError::Setup(err));
        }
        Ok(fd)
    }
}

/// Open a non-blocking TCP socket for an async connect, without
/// binding or listening.
pub fn new_connect_socket() -> Result<RawFd, ReactorError> {
    // SAFETY: single syscall, checked below.
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM | libc::SOCK_NONBLOCK, 0) };
    if fd < 0 {
        return Err(ReactorError::Setup(std::io::Error::last_os_error()));
    }
    Ok(fd)
}

fn sockaddr_in(addr: &SocketAddr) -> (libc::sockaddr_in, libc::socklen_t) {
    let SocketAddr::V4(v4) = addr else { unreachable!("listener binds are always v4 here") };
    let sin = libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: v4.port().to_be(),
        sin_addr: libc::in_addr { s_addr: u32::from_ne_bytes(v4.ip().octets()) },
        sin_zero: [0; 8],
    };
    (sin, std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
}

/// Cancel any in-flight ops then close, so a completion for this fd
/// never arrives after it's gone.
pub fn cancel_then_close(reactor: &mut sk_reactor::Reactor, fd: RawFd) {
    let _ = reactor.submit_cancel(fd);
    // SAFETY: `fd` is owned by the caller and not used after this point.
    unsafe { libc::close(fd) };
}
