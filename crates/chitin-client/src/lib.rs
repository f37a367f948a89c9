// crates/chitin-client/src/lib.rs
// ============================================================================
// Module: Chitin Client Library
// Description: Dual-transport Rust client for the Chitin security engine.
// Purpose: Provide one session API over the native C ABI and the RPC
//          sidecar with identical semantics.
// Dependencies: chitin-core, libloading, reqwest, serde, serde_json, url
// ============================================================================

//! ## Overview
//! This crate binds the Chitin security engine: agents record observed
//! content and proposed tool calls as events, receive allow/deny/escalate
//! verdicts, and trace events back to the untrusted inputs that influenced
//! them. A session ([`Engine`]) reaches the engine either in-process through
//! the native shared library or over the HTTP sidecar; the transport is
//! selected once at construction and is invisible to callers.
//! Invariants:
//! - Both transports classify results through the shared outcome mapper, so
//!   return shapes are transport-invariant.
//! - Deny and escalate verdicts from propose are returned as data, never as
//!   errors.
//!
//! Security posture: everything received from the engine or the sidecar is
//! untrusted input; adapters parse defensively and fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
mod engine;
mod native;
mod resolve;
mod rpc;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use chitin_core::Decision;
pub use chitin_core::DecisionOutcome;
pub use chitin_core::EngineError;
pub use chitin_core::EventId;
pub use chitin_core::ExplainResult;
pub use chitin_core::Metadata;
pub use chitin_core::RiskTier;
pub use chitin_core::Status;
pub use chitin_core::ToolRegistration;
pub use chitin_core::TrustLevel;
pub use config::EngineConfig;
pub use engine::Engine;
pub use engine::Transport;
