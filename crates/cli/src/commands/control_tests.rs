use super::*;

#[test]
fn create_builds_flags_in_order() {
    let cmd = Commands::Create {
        kind: "proxy".to_string(),
        name: "p1".to_string(),
        port: Some(19080),
        udp: false,
        backend: vec!["127.0.0.1:19081".to_string(), "127.0.0.1:19082".to_string()],
        strategy: Some("round-robin".to_string()),
        protocol: Some("tcp".to_string()),
        script: None,
        group: None,
        owner: None,
    };
    assert_eq!(
        to_line(&cmd),
        "create proxy p1 -p 19080 --backend 127.0.0.1:19081,127.0.0.1:19082 --strategy round-robin --protocol tcp"
    );
}

#[test]
fn start_with_interactive_flag() {
    let cmd = Commands::Start { name: "s1".to_string(), interactive: true };
    assert_eq!(to_line(&cmd), "start s1 -i");
}

#[test]
fn start_without_interactive_flag() {
    let cmd = Commands::Start { name: "s1".to_string(), interactive: false };
    assert_eq!(to_line(&cmd), "start s1");
}

#[test]
fn stats_omits_name_when_absent() {
    assert_eq!(to_line(&Commands::Stats { name: None }), "stats");
    assert_eq!(to_line(&Commands::Stats { name: Some("s1".to_string()) }), "stats s1");
}

#[test]
fn send_joins_message_words_unquoted() {
    let cmd = Commands::Send { name: "c1".to_string(), message: vec!["hello".to_string(), "world".to_string()] };
    assert_eq!(to_line(&cmd), "send c1 hello world");
}

#[test]
fn names_with_whitespace_are_quoted() {
    let cmd = Commands::Stop { name: "weird name".to_string() };
    assert_eq!(to_line(&cmd), "stop \"weird name\"");
}

#[test]
fn action_builds_name_verb_args() {
    let cmd =
        Commands::Action { name: "ch1".to_string(), verb: "publish".to_string(), args: vec!["hello".to_string()] };
    assert_eq!(to_line(&cmd), "action ch1 publish hello");
}
