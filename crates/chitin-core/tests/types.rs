// crates/chitin-core/tests/types.rs
// ============================================================================
// Module: Data Model Tests
// Description: Validate wire forms and ordering of the public data model.
// Purpose: Keep trust ordinals, identifiers, and verdict shapes stable.
// Dependencies: chitin-core, serde_json
// ============================================================================

//! Wire-form and ordering tests for the caller-facing data model.

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

use chitin_core::Decision;
use chitin_core::DecisionOutcome;
use chitin_core::EventId;
use chitin_core::ExplainResult;
use chitin_core::RiskTier;
use chitin_core::Status;
use chitin_core::TrustLevel;
use serde_json::json;

/// Trust ordinals are fixed by the engine contract.
#[test]
fn trust_level_ordinals_are_stable() {
    assert_eq!(TrustLevel::System.ordinal(), 0);
    assert_eq!(TrustLevel::Operator.ordinal(), 1);
    assert_eq!(TrustLevel::User.ordinal(), 2);
    assert_eq!(TrustLevel::External.ordinal(), 3);
    assert_eq!(TrustLevel::Unknown.ordinal(), 4);
    for ordinal in 0 ..= 4 {
        let level = TrustLevel::from_ordinal(ordinal).expect("valid ordinal");
        assert_eq!(level.ordinal(), ordinal);
    }
    assert!(TrustLevel::from_ordinal(5).is_none());
    assert!(TrustLevel::from_ordinal(-1).is_none());
}

/// Lower ordinal means more trusted.
#[test]
fn trust_level_ordering_follows_ordinal() {
    assert!(TrustLevel::System < TrustLevel::Operator);
    assert!(TrustLevel::User < TrustLevel::External);
    assert!(TrustLevel::External < TrustLevel::Unknown);
}

/// Event identifiers serialize as plain numbers.
#[test]
fn event_id_is_transparent_on_the_wire() {
    let id = EventId::new(42);
    assert_eq!(serde_json::to_value(id).unwrap(), json!(42));
    let decoded: EventId = serde_json::from_value(json!(42)).unwrap();
    assert_eq!(decoded, id);
    assert_eq!(id.get(), 42);
}

/// The allow constructor produces the canonical allow verdict.
#[test]
fn decision_allow_constructor() {
    let decision = Decision::allow(EventId::new(7));
    assert!(decision.allowed);
    assert_eq!(decision.outcome, DecisionOutcome::Allow);
    assert_eq!(decision.event_id, EventId::new(7));
    assert!(decision.rule_id.is_none());
    assert!(decision.reason.is_none());
}

/// Outcomes and risk tiers use lowercase wire names.
#[test]
fn enum_wire_names_are_lowercase() {
    assert_eq!(serde_json::to_value(DecisionOutcome::Escalate).unwrap(), json!("escalate"));
    let outcome: DecisionOutcome = serde_json::from_value(json!("deny")).unwrap();
    assert_eq!(outcome, DecisionOutcome::Deny);
    assert_eq!(serde_json::to_value(RiskTier::High).unwrap(), json!("high"));
    assert_eq!(RiskTier::default(), RiskTier::Medium);
}

/// Absent decision fields deserialize as `None` and are omitted on output.
#[test]
fn decision_optional_fields_round_trip() {
    let decision: Decision = serde_json::from_value(json!({
        "allowed": false,
        "outcome": "deny",
        "event_id": 9,
    }))
    .unwrap();
    assert!(decision.rule_id.is_none());
    assert!(decision.reason.is_none());
    let rendered = serde_json::to_value(&decision).unwrap();
    assert!(rendered.get("rule_id").is_none());
    assert!(rendered.get("reason").is_none());
}

/// Explain results default both fields.
#[test]
fn explain_result_defaults() {
    let explanation: ExplainResult = serde_json::from_value(json!({})).unwrap();
    assert_eq!(explanation, ExplainResult::default());
    let explanation: ExplainResult = serde_json::from_value(json!({
        "text": "traced via ingest",
        "trace_chain": [{"event_id": 1}],
    }))
    .unwrap();
    assert_eq!(explanation.text, "traced via ingest");
    assert_eq!(explanation.trace_chain.len(), 1);
}

/// Status codes round-trip through their raw wire values.
#[test]
fn status_codes_match_engine_header() {
    assert_eq!(Status::Ok.as_raw(), 0);
    assert_eq!(Status::Invalid.as_raw(), -1);
    assert_eq!(Status::Denied.as_raw(), -2);
    assert_eq!(Status::Escalated.as_raw(), -3);
    assert_eq!(Status::Internal.as_raw(), -4);
    assert_eq!(Status::NotFound.as_raw(), -5);
    for raw in [0, -1, -2, -3, -4, -5] {
        assert_eq!(Status::from_raw(raw).expect("known code").as_raw(), raw);
    }
    assert!(Status::from_raw(1).is_none());
    assert!(Status::from_raw(-6).is_none());
    assert!(Status::Denied.is_policy_verdict());
    assert!(Status::Escalated.is_policy_verdict());
    assert!(!Status::Internal.is_policy_verdict());
}
