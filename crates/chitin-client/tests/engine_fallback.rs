// crates/chitin-client/tests/engine_fallback.rs
// ============================================================================
// Module: Transport Cascade Tests
// Description: Integration tests for session construction and fallback.
// Purpose: Validate that native unavailability threads through to the RPC
//          fallback and that double failure names both remediation paths.
// Dependencies: chitin-client, tiny_http
// ============================================================================

//! ## Overview
//! Construction tries the native transport first and falls back to the RPC
//! sidecar. These tests force native unavailability with an override path
//! naming an existing non-library file, then check both the fallback and the
//! double-failure diagnostics. Configuration is injected explicitly so tests
//! never mutate the process environment.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use chitin_client::Engine;
use chitin_client::EngineConfig;
use chitin_client::EngineError;
use chitin_client::Status;
use chitin_client::Transport;
use chitin_client::TrustLevel;

use crate::common::bogus_library;
use crate::common::spawn_sidecar;

/// With a broken native override and no sidecar target, construction fails
/// and the message names both remediation mechanisms.
#[test]
fn double_failure_names_both_remediations() {
    let bogus = bogus_library();
    let config = EngineConfig::default().with_library_path(bogus.path());

    let error = Engine::open_with(config).unwrap_err();
    assert!(matches!(error, EngineError::Unavailable(_)));
    assert_eq!(error.status(), Status::Invalid);
    let message = error.to_string();
    assert!(message.contains("CHITIN_LIB_PATH"), "missing override hint: {message}");
    assert!(message.contains("CHITIN_SIDECAR_URL"), "missing sidecar hint: {message}");
}

/// Native unavailability falls back to a working sidecar, and the session
/// operates through it end to end.
#[test]
fn falls_back_to_rpc_and_operates() {
    let (url, handle) = spawn_sidecar(vec![
        (200, "{\"status\":0,\"event_id\":1}".to_string()),
        (
            200,
            "{\"allowed\":true,\"outcome\":\"allow\",\"event_id\":2}".to_string(),
        ),
        (200, "{\"status\":0,\"event_id\":3}".to_string()),
    ]);
    let bogus = bogus_library();
    let config =
        EngineConfig::default().with_library_path(bogus.path()).with_sidecar_url(url);

    let engine = Engine::open_with(config).unwrap();
    assert_eq!(engine.transport(), Some(Transport::Rpc));

    // Mirror of the canonical smoke flow: ingest, propose, record result.
    let event_id = engine.ingest("user said hi", TrustLevel::User, None).unwrap();
    let decision = engine.propose("noop", "{}", None, Some(&[event_id])).unwrap();
    assert!(decision.allowed);
    let result_id = engine.record_result(decision.event_id, "ok", 0).unwrap();
    assert_eq!(result_id.get(), 3);

    engine.close();
    assert!(engine.transport().is_none());
    assert!(matches!(
        engine.ingest("late", TrustLevel::User, None),
        Err(EngineError::Closed)
    ));
    handle.join().unwrap();
}

/// An unusable sidecar target surfaces alongside the native failure.
#[test]
fn invalid_sidecar_target_fails_construction() {
    let bogus = bogus_library();
    let config = EngineConfig::default()
        .with_library_path(bogus.path())
        .with_sidecar_url("ftp://127.0.0.1:9131");

    let error = Engine::open_with(config).unwrap_err();
    assert!(matches!(error, EngineError::Unavailable(_)));
    let message = error.to_string();
    assert!(message.contains("scheme"), "missing scheme diagnostic: {message}");
    assert!(message.contains("CHITIN_SIDECAR_URL"), "missing sidecar hint: {message}");
}

/// A missing override path falls through resolution and still fails cleanly
/// when nothing else is loadable.
#[test]
fn missing_override_fails_cleanly() {
    let config = EngineConfig::default()
        .with_library_path("/nonexistent/chitin/libchitin.so")
        .with_config_path("/nonexistent/chitin/policy.toml");

    // The resolver falls through to the loader search path; with no engine
    // installed this must surface as unavailable, not a panic.
    match Engine::open_with(config) {
        Err(EngineError::Unavailable(message)) => {
            assert!(message.contains("CHITIN_LIB_PATH"));
        }
        Err(other) => panic!("expected unavailable, got {other}"),
        Ok(engine) => {
            // A machine with a system-wide engine install is a valid
            // environment; the session must then be native.
            assert_eq!(engine.transport(), Some(Transport::Native));
        }
    }
}
