// SPDX-License-Identifier: MIT

use super::*;

fn base(kind: RuntimeKind) -> RuntimeConfig {
    RuntimeConfig {
        kind,
        port: 19000,
        udp: false,
        tls_cert_path: None,
        tls_key_path: None,
        script_path: None,
        owner: None,
        child_policy: ChildPolicy::Stop,
        group: None,
        backends: vec![],
        strategy: None,
        protocol: None,
        upstreams: vec![],
        mesh_tls: false,
        externally_managed: false,
        fsync_every_write: true,
        was_running: false,
    }
}

#[test]
fn server_with_a_port_validates() {
    assert!(base(RuntimeKind::Server).validate().is_ok());
}

#[test]
fn client_does_not_require_a_port() {
    let mut cfg = base(RuntimeKind::Client);
    cfg.port = 0;
    assert!(cfg.validate().is_ok());
}

#[test]
fn server_without_a_port_is_rejected() {
    let mut cfg = base(RuntimeKind::Server);
    cfg.port = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn proxy_without_backends_is_rejected() {
    let cfg = base(RuntimeKind::Proxy);
    assert!(matches!(cfg.validate(), Err(RegistryError::InvalidConfig(_))));
}

#[test]
fn proxy_with_a_backend_validates() {
    let mut cfg = base(RuntimeKind::Proxy);
    cfg.backends.push("127.0.0.1:9000".into());
    assert!(cfg.validate().is_ok());
}

#[test]
fn old_on_disk_json_without_new_fields_still_deserializes() {
    let old_json = r#"{"kind":"server","port":19000}"#;
    let cfg: RuntimeConfig = serde_json::from_str(old_json).unwrap();
    assert!(!cfg.mesh_tls);
    assert!(cfg.fsync_every_write);
}
