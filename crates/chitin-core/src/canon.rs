// crates/chitin-core/src/canon.rs
// ============================================================================
// Module: Canonical JSON Encoding
// Description: Deterministic JSON text encoding for structured values.
// Purpose: Give both transports one well-defined encoding for metadata and
//          tool configuration crossing the native boundary.
// Dependencies: serde, serde_jcs
// ============================================================================

//! ## Overview
//! The native boundary has no structured-value type, so structured inputs are
//! serialized to text before crossing it. The encoding is RFC 8785 canonical
//! JSON: key order and number formatting are deterministic, so equal values
//! always produce byte-identical text and round-trips are testable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::types::ToolRegistration;

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a value as canonical JSON text.
///
/// # Errors
///
/// Returns [`EngineError::Invalid`] when the value cannot be represented as
/// canonical JSON (for example, non-finite floats).
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, EngineError> {
    serde_jcs::to_string(value)
        .map_err(|err| EngineError::Invalid(format!("canonical json encoding failed: {err}")))
}

/// Encodes a tool registration's configuration payload.
///
/// The tool name travels as a separate argument; the payload carries only the
/// risk tier and, when present, the category.
///
/// # Errors
///
/// Returns [`EngineError::Invalid`] when encoding fails.
pub fn tool_config_json(registration: &ToolRegistration) -> Result<String, EngineError> {
    let mut config = serde_json::Map::new();
    config.insert("risk".to_string(), Value::String(registration.risk.as_str().to_string()));
    if let Some(category) = &registration.category {
        config.insert("category".to_string(), Value::String(category.clone()));
    }
    to_canonical_json(&config)
}
