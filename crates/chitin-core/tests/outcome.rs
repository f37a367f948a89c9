// crates/chitin-core/tests/outcome.rs
// ============================================================================
// Module: Outcome Mapper Tests
// Description: Validate the shared status classification rules.
// Purpose: Ensure both transports inherit identical result semantics.
// Dependencies: chitin-core
// ============================================================================

//! Classification tests for the outcome mapper shared by every transport.

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

use chitin_core::DecisionOutcome;
use chitin_core::EngineError;
use chitin_core::EventId;
use chitin_core::Status;
use chitin_core::outcome::propose_decision;
use chitin_core::outcome::require_ok;
use chitin_core::outcome::verdict_fields;

/// A success status passes through without invoking the message fetch.
#[test]
fn require_ok_accepts_success_without_message_fetch() {
    let result = require_ok("ingest", 0, || unreachable!("message fetched on success"));
    assert!(result.is_ok());
}

/// Engine error codes map onto the canonical taxonomy.
#[test]
fn require_ok_maps_error_codes() {
    let error = require_ok("ingest", -1, || "bad trust level".to_string()).unwrap_err();
    assert!(matches!(error, EngineError::Invalid(_)));
    assert_eq!(error.status(), Status::Invalid);

    let error = require_ok("is_traced", -5, || "no such event".to_string()).unwrap_err();
    assert!(matches!(error, EngineError::NotFound(_)));

    let error = require_ok("explain", -4, || "engine fault".to_string()).unwrap_err();
    assert!(matches!(error, EngineError::Internal(_)));
}

/// Unknown status codes classify as internal errors.
#[test]
fn require_ok_treats_unknown_codes_as_internal() {
    let error = require_ok("ingest", -99, || "garbled".to_string()).unwrap_err();
    assert!(matches!(error, EngineError::Internal(_)));
}

/// Policy verdict codes outside propose are an engine contract violation.
#[test]
fn policy_status_outside_propose_is_contract_violation() {
    for raw in [-2, -3] {
        let error = require_ok("set_label", raw, || "spurious verdict".to_string()).unwrap_err();
        assert!(matches!(error, EngineError::Internal(_)));
        let message = error.to_string();
        assert!(message.contains("policy status"), "diagnostic missing: {message}");
        assert!(message.contains("set_label"), "operation missing: {message}");
    }
}

/// A success status builds the allow verdict without an error fetch.
#[test]
fn propose_success_builds_allow() {
    let decision =
        propose_decision(0, EventId::new(11), || unreachable!("error fetched on success"))
            .unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.outcome, DecisionOutcome::Allow);
    assert_eq!(decision.event_id, EventId::new(11));
}

/// Denied and escalated statuses are values, never errors.
#[test]
fn propose_verdicts_are_values() {
    let decision = propose_decision(-2, EventId::new(5), || {
        "{\"rule_id\":\"rule-7\",\"reason\":\"untrusted input\"}".to_string()
    })
    .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.outcome, DecisionOutcome::Deny);
    assert_eq!(decision.rule_id.as_deref(), Some("rule-7"));
    assert_eq!(decision.reason.as_deref(), Some("untrusted input"));

    let decision = propose_decision(-3, EventId::new(6), || {
        "{\"rule_id\":\"rule-9\",\"reason\":\"needs human approval\"}".to_string()
    })
    .unwrap();
    assert_eq!(decision.outcome, DecisionOutcome::Escalate);
    assert_eq!(decision.rule_id.as_deref(), Some("rule-9"));
}

/// Statuses outside the verdict set raise from propose.
#[test]
fn propose_raises_only_outside_verdict_statuses() {
    let error = propose_decision(-4, EventId::new(0), || "engine fault".to_string()).unwrap_err();
    assert!(matches!(error, EngineError::Internal(_)));
    let error = propose_decision(-1, EventId::new(0), || "bad params".to_string()).unwrap_err();
    assert!(matches!(error, EngineError::Invalid(_)));
}

/// An unparseable verdict payload degrades to the raw text as reason.
#[test]
fn verdict_fields_degrade_to_raw_text() {
    let (rule_id, reason) = verdict_fields("denied by policy");
    assert!(rule_id.is_none());
    assert_eq!(reason.as_deref(), Some("denied by policy"));

    let (rule_id, reason) = verdict_fields("{\"rule_id\":\"r-1\"}");
    assert_eq!(rule_id.as_deref(), Some("r-1"));
    assert!(reason.is_none());

    let (rule_id, reason) = verdict_fields("[1,2,3]");
    assert!(rule_id.is_none());
    assert_eq!(reason.as_deref(), Some("[1,2,3]"));
}
