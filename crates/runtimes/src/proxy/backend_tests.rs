use super::*;

#[test]
fn a_fresh_backend_is_healthy_and_closed() {
    let b = BackendState::new("10.0.0.1:80".into());
    assert!(b.healthy);
    assert_eq!(b.circuit, CircuitState::Closed);
}

#[test]
fn health_probe_failures_below_threshold_stay_healthy() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.observe_probe(false, 3);
    b.observe_probe(false, 3);
    assert!(b.healthy);
}

#[test]
fn health_probe_failures_at_threshold_mark_unhealthy() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.observe_probe(false, 3);
    b.observe_probe(false, 3);
    b.observe_probe(false, 3);
    assert!(!b.healthy);
}

#[test]
fn a_successful_probe_resets_the_failure_streak() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.observe_probe(false, 3);
    b.observe_probe(false, 3);
    b.observe_probe(true, 3);
    assert!(b.healthy);
    assert_eq!(b.consecutive_health_failures, 0);
}

#[test]
fn request_failures_at_threshold_open_the_circuit() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.observe_request(false, 2, 1_000);
    assert_eq!(b.circuit, CircuitState::Closed);
    b.observe_request(false, 2, 1_000);
    assert_eq!(b.circuit, CircuitState::Open(1_000));
}

#[test]
fn an_open_circuit_becomes_half_open_after_the_timeout() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.circuit = CircuitState::Open(1_000);
    assert!(!b.is_available(5_000, 3_000));
    assert!(b.is_available(5_000, 6_000));
    assert_eq!(b.circuit, CircuitState::HalfOpen);
}

#[test]
fn a_half_open_failure_reopens_the_circuit() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.circuit = CircuitState::HalfOpen;
    b.observe_request(false, 10, 9_000);
    assert_eq!(b.circuit, CircuitState::Open(9_000));
}

#[test]
fn a_half_open_success_closes_the_circuit() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.circuit = CircuitState::HalfOpen;
    b.observe_request(true, 10, 9_000);
    assert_eq!(b.circuit, CircuitState::Closed);
}

#[test]
fn an_unhealthy_backend_is_unavailable_even_with_a_closed_circuit() {
    let mut b = BackendState::new("10.0.0.1:80".into());
    b.healthy = false;
    assert!(!b.is_available(5_000, 0));
}
