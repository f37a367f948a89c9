// crates/chitin-core/src/outcome.rs
// ============================================================================
// Module: Outcome Mapper
// Description: Shared classification of engine statuses into results.
// Purpose: Guarantee identical return shapes from every transport adapter.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Both transport adapters funnel every engine status through this module,
//! which classifies it into exactly one of three shapes: a success value, a
//! policy verdict, or an exceptional failure. `DENIED` and `ESCALATED` become
//! [`Decision`] values only for `propose`; from any other operation they are
//! an engine contract violation surfaced as an internal error, never
//! silently swallowed.
//! Invariants:
//! - [`propose_decision`] never fails for statuses in `{OK, DENIED,
//!   ESCALATED}`.
//! - Error messages are fetched lazily so the native adapter's last-error
//!   call happens only on non-success statuses.
//!
//! Security posture: verdict payloads are untrusted engine text; parse
//! failures degrade to carrying the raw text as the reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;

use crate::error::EngineError;
use crate::status::Status;
use crate::types::Decision;
use crate::types::DecisionOutcome;
use crate::types::EventId;

// ============================================================================
// SECTION: Status Classification
// ============================================================================

/// Requires a success status from a non-propose operation.
///
/// The `message` closure is invoked at most once, and only for non-`OK`
/// statuses; the native adapter uses it to defer its last-error fetch.
///
/// # Errors
///
/// Returns [`EngineError`] for every non-`OK` status. Policy verdict codes
/// are a contract violation outside `propose` and map to
/// [`EngineError::Internal`] with a diagnostic naming the operation.
pub fn require_ok(
    operation: &str,
    status: i32,
    message: impl FnOnce() -> String,
) -> Result<(), EngineError> {
    match Status::from_raw(status) {
        Some(Status::Ok) => Ok(()),
        Some(code) if code.is_policy_verdict() => Err(EngineError::Internal(format!(
            "engine returned policy status {status} for {operation}: {}",
            message()
        ))),
        _ => Err(EngineError::from_status(status, message())),
    }
}

/// Maps a propose status onto a [`Decision`].
///
/// `OK` builds the allow verdict; `DENIED` and `ESCALATED` build the
/// corresponding non-allow verdict from the engine's structured error
/// payload. The `last_error` closure is invoked at most once, and only for
/// non-`OK` statuses.
///
/// # Errors
///
/// Returns [`EngineError`] only for statuses outside
/// `{OK, DENIED, ESCALATED}`.
pub fn propose_decision(
    status: i32,
    event_id: EventId,
    last_error: impl FnOnce() -> String,
) -> Result<Decision, EngineError> {
    match Status::from_raw(status) {
        Some(Status::Ok) => Ok(Decision::allow(event_id)),
        Some(Status::Denied) => Ok(verdict(DecisionOutcome::Deny, event_id, &last_error())),
        Some(Status::Escalated) => Ok(verdict(DecisionOutcome::Escalate, event_id, &last_error())),
        _ => Err(EngineError::from_status(status, last_error())),
    }
}

// ============================================================================
// SECTION: Verdict Construction
// ============================================================================

/// Structured verdict payload carried by the engine's last error.
#[derive(Debug, Deserialize)]
struct VerdictPayload {
    /// Identifier of the rule that fired.
    rule_id: Option<String>,
    /// Human-readable reason for the verdict.
    reason: Option<String>,
}

/// Builds a non-allow verdict from the engine's error payload.
fn verdict(outcome: DecisionOutcome, event_id: EventId, raw: &str) -> Decision {
    let (rule_id, reason) = verdict_fields(raw);
    Decision {
        allowed: false,
        outcome,
        event_id,
        rule_id,
        reason,
    }
}

/// Extracts `(rule_id, reason)` from a verdict payload.
///
/// When the payload is not a JSON object with the expected fields, the raw
/// text becomes the reason and the rule id is absent.
#[must_use]
pub fn verdict_fields(raw: &str) -> (Option<String>, Option<String>) {
    match serde_json::from_str::<VerdictPayload>(raw) {
        Ok(payload) => (payload.rule_id, payload.reason),
        Err(_) => (None, Some(raw.to_string())),
    }
}
