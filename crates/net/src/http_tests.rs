// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn sniff_recognizes_the_three_methods() {
    assert_eq!(Method::sniff(b"GET / HTTP/1.1\r\n"), Some(Method::Get));
    assert_eq!(Method::sniff(b"POST /x HTTP/1.1\r\n"), Some(Method::Post));
    assert_eq!(Method::sniff(b"HEAD / HTTP/1.1\r\n"), Some(Method::Head));
}

#[test]
fn sniff_returns_none_for_non_http_bytes() {
    assert_eq!(Method::sniff(b"\x01\x02\x03"), None);
}

#[test]
fn resolve_under_root_joins_a_plain_path() {
    let root = Path::new("/srv/www");
    assert_eq!(resolve_under_root(root, "/index.html").unwrap(), Path::new("/srv/www/index.html"));
}

#[test]
fn resolve_under_root_defaults_empty_path_to_index() {
    let root = Path::new("/srv/www");
    assert_eq!(resolve_under_root(root, "/").unwrap(), Path::new("/srv/www/index.html"));
}

#[test]
fn resolve_under_root_rejects_parent_traversal() {
    let root = Path::new("/srv/www");
    assert_eq!(resolve_under_root(root, "/../../etc/passwd"), None);
}

#[test]
fn content_type_maps_known_extensions() {
    assert_eq!(content_type_for(Path::new("a.html")), "text/html; charset=utf-8");
    assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
}

#[test]
fn build_response_includes_content_length() {
    let resp = build_response(200, "OK", "text/plain", b"hi");
    let text = String::from_utf8(resp).unwrap();
    assert!(text.contains("Content-Length: 2"));
    assert!(text.ends_with("hi"));
}

#[test]
fn parse_request_extracts_method_and_path() {
    let (req, consumed) = parse_request(b"GET /foo?x=1 HTTP/1.1\r\nHost: x\r\n\r\n").unwrap().unwrap();
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.path, "/foo?x=1");
    assert_eq!(consumed, "GET /foo?x=1 HTTP/1.1\r\nHost: x\r\n\r\n".len());
}

#[test]
fn parse_request_waits_for_a_complete_header_block() {
    assert!(parse_request(b"GET / HTTP/1.1\r\nHost: x").unwrap().is_none());
}
