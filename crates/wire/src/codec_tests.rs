// SPDX-License-Identifier: MIT

use super::*;
use std::time::Duration;

#[test]
fn tokenize_splits_on_whitespace() {
    assert_eq!(tokenize("create server s1 -p 19000").unwrap(), vec!["create", "server", "s1", "-p", "19000"]);
}

#[test]
fn tokenize_honors_quotes() {
    assert_eq!(tokenize(r#"send s1 "hello world""#).unwrap(), vec!["send", "s1", "hello world"]);
}

#[test]
fn tokenize_rejects_unterminated_quote() {
    assert!(tokenize(r#"send s1 "oops"#).is_err());
}

#[test]
fn parse_create_server_with_port() {
    let req = parse_line("create server s1 -p 19000\n").unwrap();
    assert_eq!(
        req,
        Request::Create {
            kind: "server".into(),
            name: "s1".into(),
            port: Some(19000),
            udp: false,
            backend: vec![],
            strategy: None,
            protocol: None,
            script: None,
            group: None,
            owner: None,
        }
    );
}

#[test]
fn parse_create_proxy_with_backends_and_strategy() {
    let req = parse_line(
        "create proxy p1 -p 19080 --backend 127.0.0.1:19081,127.0.0.1:19082 --strategy round-robin --protocol tcp",
    )
    .unwrap();
    match req {
        Request::Create { kind, name, port, backend, strategy, protocol, .. } => {
            assert_eq!(kind, "proxy");
            assert_eq!(name, "p1");
            assert_eq!(port, Some(19080));
            assert_eq!(backend, vec!["127.0.0.1:19081", "127.0.0.1:19082"]);
            assert_eq!(strategy.as_deref(), Some("round-robin"));
            assert_eq!(protocol.as_deref(), Some("tcp"));
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn parse_start_with_interactive_flag() {
    let req = parse_line("start s1 -i").unwrap();
    assert_eq!(req, Request::Start { name: "s1".into(), interactive: true });
}

#[test]
fn parse_start_without_flag_is_not_interactive() {
    let req = parse_line("start s1").unwrap();
    assert_eq!(req, Request::Start { name: "s1".into(), interactive: false });
}

#[test]
fn parse_action_collects_trailing_args() {
    let req = parse_line("action s1 kick alice bob").unwrap();
    assert_eq!(
        req,
        Request::Action { name: "s1".into(), verb: "kick".into(), args: vec!["alice".into(), "bob".into()] }
    );
}

#[test]
fn parse_unknown_command_errors() {
    assert!(parse_line("bogus").is_err());
}

#[test]
fn parse_empty_line_errors() {
    assert!(parse_line("").is_err());
}

#[tokio::test]
async fn read_request_reads_until_newline() {
    let input = b"ls\nps\n".to_vec();
    let mut cursor = std::io::Cursor::new(input);
    let req = read_request(&mut cursor, Duration::from_secs(1)).await.unwrap();
    assert_eq!(req, Request::Ls);
    let req = read_request(&mut cursor, Duration::from_secs(1)).await.unwrap();
    assert_eq!(req, Request::Ps);
}

#[tokio::test]
async fn write_response_frames_exit_code_body_and_nul() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::Ok, Duration::from_secs(1)).await.unwrap();
    assert_eq!(buf, vec![0u8, 0u8]);

    let mut buf = Vec::new();
    write_response(&mut buf, &Response::Error { message: "bad".into() }, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(buf, [&[1u8], b"bad".as_slice(), &[0u8]].concat());
}
