//! Proxy runtime round-robin fairness. The two backends are plain
//! `std::net::TcpListener`s
//! run in-process, each counting the bytes it receives per connection
//! — lighter than standing up two more `socketleyd` instances, and the
//! proxy driver picks a backend once per accepted connection (see
//! `sk-daemon::net::proxy_driver::dial_backend`), so one message per
//! connection is what exercises its selection logic.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::prelude::*;

fn counting_backend() -> (std::net::SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind backend");
    let addr = listener.local_addr().expect("local_addr");
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = [0u8; 64];
            if stream.read(&mut buf).unwrap_or(0) > 0 {
                count_clone.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(b"ack");
            }
        }
    });
    (addr, count)
}

#[test]
fn round_robin_splits_ten_requests_evenly_across_two_backends() {
    let h = Harness::new();
    let (addr_a, count_a) = counting_backend();
    let (addr_b, count_b) = counting_backend();
    let proxy_port = free_port();

    h.cli()
        .args([
            "create",
            "proxy",
            "p1",
            "-p",
            &proxy_port.to_string(),
            "--backend",
            &format!("{addr_a},{addr_b}"),
            "--strategy",
            "round-robin",
            "--protocol",
            "tcp",
        ])
        .passes();
    h.cli().args(["start", "p1"]).passes();

    for i in 0..10 {
        let mut client = connect_with_retry(proxy_port, SPEC_WAIT_MAX_MS);
        let reply = send_and_read(&mut client, format!("msg-{i}\n").as_bytes(), 3, SPEC_WAIT_MAX_MS);
        assert_eq!(reply, b"ack", "message {i} should reach a backend and get acked");
    }

    let a = count_a.load(Ordering::SeqCst);
    let b = count_b.load(Ordering::SeqCst);
    assert_eq!(a + b, 10, "all 10 requests should land on one of the two backends");
    assert_eq!(a, 5, "round-robin over 2 backends and 10 requests should split evenly, got a={a} b={b}");
    assert_eq!(b, 5, "round-robin over 2 backends and 10 requests should split evenly, got a={a} b={b}");
}
