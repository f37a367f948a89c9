// crates/chitin-core/src/error.rs
// ============================================================================
// Module: Engine Error Taxonomy
// Description: Exceptional failure type shared by every transport adapter.
// Purpose: Carry a canonical status code and message for every failure.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`EngineError`] covers everything that is not a success value or a policy
//! verdict: construction failures, operations on a closed session, inputs the
//! engine rejected, missing referents, and all transport-level problems.
//! Policy verdicts from `propose` are never represented here; they are data.
//! Invariants:
//! - Variants are stable for programmatic handling.
//! - String payloads are user-facing and may include untrusted engine text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::status::Status;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Exceptional failure raised by an engine session.
///
/// # Invariants
/// - [`EngineError::status`] maps every variant onto the canonical status
///   taxonomy, so caller code is transport-agnostic.
/// - Deny/escalate verdicts from `propose` are returned as
///   [`crate::Decision`] values and never appear here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable transport could be established at session construction.
    #[error("chitin engine unavailable: {0}")]
    Unavailable(String),
    /// An operation was invoked on a closed session.
    #[error("engine is closed")]
    Closed,
    /// The engine rejected malformed input.
    #[error("invalid input: {0}")]
    Invalid(String),
    /// A referenced event, label, or tool does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Engine internal failure, transport failure, or malformed response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the canonical status code carried by this error.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Unavailable(_) | Self::Closed | Self::Invalid(_) => Status::Invalid,
            Self::NotFound(_) => Status::NotFound,
            Self::Internal(_) => Status::Internal,
        }
    }

    /// Builds an error from a raw engine status code and message.
    ///
    /// Policy verdict codes must be intercepted by the outcome mapper before
    /// reaching this constructor; if one slips through, and for every code
    /// outside the canonical set, the error is classified internal.
    #[must_use]
    pub fn from_status(raw: i32, message: String) -> Self {
        match Status::from_raw(raw) {
            Some(Status::Invalid) => Self::Invalid(message),
            Some(Status::NotFound) => Self::NotFound(message),
            Some(Status::Ok) => {
                Self::Internal(format!("engine reported success alongside an error: {message}"))
            }
            _ => Self::Internal(message),
        }
    }
}
