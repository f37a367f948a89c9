// crates/chitin-core/src/status.rs
// ============================================================================
// Module: Engine Status Taxonomy
// Description: Canonical status codes returned by the Chitin engine.
// Purpose: Share one wire-stable status vocabulary across all transports.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The engine reports every operation result as a signed 32-bit status code.
//! The codes are part of the engine ABI and the sidecar wire contract, so
//! caller code stays transport-agnostic. `DENIED` and `ESCALATED` are policy
//! verdict carriers consumed by the outcome mapper; they are valid only for
//! `propose` and are a contract violation anywhere else.
//! Invariants:
//! - Discriminant values match the engine header and never change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Status Codes
// ============================================================================

/// Canonical engine status codes.
///
/// # Invariants
/// - Values are fixed by the engine ABI: `OK=0`, `INVALID=-1`, `DENIED=-2`,
///   `ESCALATED=-3`, `INTERNAL=-4`, `NOT_FOUND=-5`.
/// - Codes outside this set are treated as internal errors by the outcome
///   mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// The operation succeeded.
    Ok = 0,
    /// The engine rejected malformed input.
    Invalid = -1,
    /// Policy verdict: the proposed call is denied.
    Denied = -2,
    /// Policy verdict: the proposed call requires escalation.
    Escalated = -3,
    /// The engine failed internally, or the transport failed.
    Internal = -4,
    /// A referenced event, label, or tool does not exist.
    NotFound = -5,
}

impl Status {
    /// Decodes a raw engine status code (returns `None` for unknown codes).
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Ok),
            -1 => Some(Self::Invalid),
            -2 => Some(Self::Denied),
            -3 => Some(Self::Escalated),
            -4 => Some(Self::Internal),
            -5 => Some(Self::NotFound),
            _ => None,
        }
    }

    /// Returns the raw wire value for this status.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Returns true when this status carries a policy verdict.
    #[must_use]
    pub const fn is_policy_verdict(self) -> bool {
        matches!(self, Self::Denied | Self::Escalated)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_raw().fmt(f)
    }
}
