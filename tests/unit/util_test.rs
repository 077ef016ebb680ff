//! Tests for utility functions

use buffered_messenger::config::LogFormat;
use buffered_messenger::util::{init_tracing, now_ms};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing(LogFormat::Text);
    init_tracing(LogFormat::Json);
}
