// crates/chitin-core/src/lib.rs
// ============================================================================
// Module: Chitin Core Library
// Description: Transport-independent data model and outcome mapping for the
//              Chitin client binding.
// Purpose: Define the types and status semantics shared by every transport.
// Dependencies: serde, serde_jcs, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate is the semantic core of the Chitin client binding. It defines
//! the public data model (trust levels, decisions, explain results, tool
//! registrations), the canonical engine status taxonomy, the error taxonomy,
//! and the outcome mapper that every transport adapter funnels through. The
//! outcome mapper is what makes the native and RPC transports
//! interchangeable: both classify every engine result into a success value, a
//! policy verdict, or an exceptional failure using the same rules.
//! Invariants:
//! - Status codes are shared verbatim by all transports.
//! - A deny or escalate verdict from `propose` is a successfully computed
//!   result, never an error.
//!
//! Security posture: engine responses are untrusted text; payloads are
//! parsed defensively and parse failures degrade to raw text, never panics.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod canon;
pub mod error;
pub mod outcome;
pub mod status;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use canon::to_canonical_json;
pub use canon::tool_config_json;
pub use error::EngineError;
pub use status::Status;
pub use types::Decision;
pub use types::DecisionOutcome;
pub use types::EventId;
pub use types::ExplainResult;
pub use types::Metadata;
pub use types::RiskTier;
pub use types::ToolRegistration;
pub use types::TrustLevel;
