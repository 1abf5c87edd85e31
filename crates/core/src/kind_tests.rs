// SPDX-License-Identifier: MIT

use super::*;
use std::str::FromStr;

#[test]
fn kind_round_trips_through_display_and_parse() {
    for kind in [RuntimeKind::Server, RuntimeKind::Client, RuntimeKind::Proxy, RuntimeKind::Cache]
    {
        let parsed = RuntimeKind::from_str(&kind.to_string()).unwrap();
        assert_eq!(kind, parsed);
    }
}

#[test]
fn kind_rejects_unknown() {
    assert!(RuntimeKind::from_str("bogus").is_err());
}

#[test]
fn child_policy_defaults_to_stop() {
    assert_eq!(ChildPolicy::default(), ChildPolicy::Stop);
}

#[test]
fn lifecycle_state_serializes_snake_case() {
    let json = serde_json::to_string(&LifecycleState::Running).unwrap();
    assert_eq!(json, "\"running\"");
}
