// crates/chitin-client/tests/transport_parity.rs
// ============================================================================
// Module: Transport Parity Tests
// Description: Transport-invariance checks for propose verdicts and errors.
// Purpose: Prove the native status mapping and the RPC decoding produce
//          field-identical results for equivalent engine states.
// Dependencies: chitin-client, chitin-core, tiny_http
// ============================================================================

//! ## Overview
//! The native transport reports verdicts as status codes plus a structured
//! last-error payload; the RPC transport reports them as response fields.
//! Given equivalent engine state, both must produce identical [`Decision`]
//! values. The native side is exercised through the shared outcome mapper
//! with the exact payloads the engine would return; the RPC side runs
//! against a loopback sidecar returning the equivalent response.

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

use chitin_client::Decision;
use chitin_client::EventId;
use chitin_client::TrustLevel;
use chitin_core::Status;
use chitin_core::outcome::propose_decision;
use chitin_core::outcome::require_ok;

use crate::common::open_rpc_engine;
use crate::common::spawn_sidecar;

/// Runs one propose against a sidecar serving the given response body.
fn rpc_decision(response_body: &str) -> Decision {
    let (url, _handle) = spawn_sidecar(vec![(200, response_body.to_string())]);
    let engine = open_rpc_engine(&url);
    engine.propose("noop", "{}", None, Some(&[EventId::new(1)])).unwrap()
}

/// Allow verdicts are field-identical across transports.
#[test]
fn allow_verdicts_are_identical() {
    let native = propose_decision(Status::Ok.as_raw(), EventId::new(3), || {
        unreachable!("error fetched on success")
    })
    .unwrap();
    let rpc = rpc_decision("{\"allowed\":true,\"outcome\":\"allow\",\"event_id\":3}");
    assert_eq!(native, rpc);
}

/// Deny verdicts carry the same rule id and reason across transports.
#[test]
fn deny_verdicts_are_identical() {
    let native = propose_decision(Status::Denied.as_raw(), EventId::new(9), || {
        "{\"rule_id\":\"rule-7\",\"reason\":\"untrusted input\"}".to_string()
    })
    .unwrap();
    let rpc = rpc_decision(
        "{\"allowed\":false,\"outcome\":\"deny\",\"event_id\":9,\"rule_id\":\"rule-7\",\
         \"reason\":\"untrusted input\"}",
    );
    assert_eq!(native, rpc);
}

/// Escalate verdicts carry the same rule id and reason across transports.
#[test]
fn escalate_verdicts_are_identical() {
    let native = propose_decision(Status::Escalated.as_raw(), EventId::new(12), || {
        "{\"rule_id\":\"rule-9\",\"reason\":\"needs human approval\"}".to_string()
    })
    .unwrap();
    let rpc = rpc_decision(
        "{\"allowed\":false,\"outcome\":\"escalate\",\"event_id\":12,\"rule_id\":\"rule-9\",\
         \"reason\":\"needs human approval\"}",
    );
    assert_eq!(native, rpc);
}

/// Exceptional failures classify identically across transports.
#[test]
fn errors_classify_identically() {
    let native = require_ok("ingest", Status::Invalid.as_raw(), || {
        "trust level out of range".to_string()
    })
    .unwrap_err();

    let (url, _handle) = spawn_sidecar(vec![(
        200,
        "{\"status\":-1,\"error\":\"trust level out of range\"}".to_string(),
    )]);
    let engine = open_rpc_engine(&url);
    let rpc = engine.ingest("content", TrustLevel::User, None).unwrap_err();

    assert_eq!(native.status(), rpc.status());
    assert_eq!(native.to_string(), rpc.to_string());
}
