mod common;

use codevet::{Scope, ValidationStatus};
use common::*;
use std::time::Duration;
use tempfile::TempDir;

const CODE: &str = "def area(w, h):\n    return w * h\n";

#[test]
fn test_identical_concurrent_requests_share_one_model_call() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::slow(VALID_REPLY, Duration::from_millis(200));
    let orchestrator = free_orchestrator(&dir, false)
        .with_cascade(cascade_with(transport.clone(), Duration::from_secs(5)));

    let orchestrator = &orchestrator;
    let verdicts: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || orchestrator.validate_code(CODE, Scope::All)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(transport.calls(), 1);
    assert!(verdicts.iter().all(|v| v.status == ValidationStatus::Valid));
    assert!(verdicts.windows(2).all(|w| w[0].same_outcome(&w[1])));

    let stats = orchestrator.get_stats();
    assert_eq!(stats.total_validations, 8);
    assert_eq!(stats.model_resolutions, 1);
    assert_eq!(stats.paid_validations, 1);
    assert_eq!(stats.cache_hits, 7);
}

#[test]
fn test_distinct_concurrent_requests_each_call_once() {
    let dir = TempDir::new().unwrap();
    let transport = MockTransport::slow(VALID_REPLY, Duration::from_millis(20));
    let orchestrator = free_orchestrator(&dir, false)
        .with_cascade(cascade_with(transport.clone(), Duration::from_secs(5)));
    let codes: Vec<String> = (0..6)
        .map(|i| format!("def f{i}(x):\n    return x + {i}\n"))
        .collect();

    std::thread::scope(|scope| {
        for code in &codes {
            let orchestrator = &orchestrator;
            scope.spawn(move || orchestrator.validate_code(code, Scope::All));
        }
    });

    assert_eq!(transport.calls(), 6);
    let stats = orchestrator.get_stats();
    assert_eq!(stats.model_resolutions, 6);
    assert_eq!(orchestrator.cache_stats().entries, 6);
}
