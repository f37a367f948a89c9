// crates/chitin-core/src/types.rs
// ============================================================================
// Module: Chitin Data Model
// Description: Public types exchanged between callers and the Chitin engine.
// Purpose: Provide strongly typed, serializable bindings with stable wire
//          forms shared by both transports.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the caller-facing data model of the client binding:
//! trust levels for ingested content, opaque event identifiers, propose
//! verdicts, explain results, and tool registrations. Wire forms are stable:
//! identifiers serialize as numbers, outcomes and risk tiers as lowercase
//! strings.
//! Invariants:
//! - [`TrustLevel`] ordering follows the ordinal: lower is more trusted.
//! - [`Decision`] values with deny/escalate outcomes are first-class results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Trust Levels
// ============================================================================

/// Trust classification for ingested content.
///
/// # Invariants
/// - Ordinals are fixed by the engine contract: `SYSTEM=0`, `OPERATOR=1`,
///   `USER=2`, `EXTERNAL=3`, `UNKNOWN=4`.
/// - Derived ordering follows declaration order, so a lower value means more
///   trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrustLevel {
    /// Content originating from the system itself.
    System,
    /// Content authored by the operator of the deployment.
    Operator,
    /// Content authored by an end user.
    User,
    /// Content fetched from an external source.
    External,
    /// Content of unknown provenance (least trusted).
    Unknown,
}

impl TrustLevel {
    /// Returns the wire ordinal for this trust level.
    #[must_use]
    pub const fn ordinal(self) -> i32 {
        match self {
            Self::System => 0,
            Self::Operator => 1,
            Self::User => 2,
            Self::External => 3,
            Self::Unknown => 4,
        }
    }

    /// Decodes a wire ordinal (returns `None` outside `0..=4`).
    #[must_use]
    pub const fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::System),
            1 => Some(Self::Operator),
            2 => Some(Self::User),
            3 => Some(Self::External),
            4 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Returns the lowercase name of this trust level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Operator => "operator",
            Self::User => "user",
            Self::External => "external",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Event Identifiers
// ============================================================================

/// Engine-assigned event identifier.
///
/// # Invariants
/// - Opaque to the client; assigned monotonically within one engine instance.
/// - Serializes as a plain number on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Wraps a raw identifier received from the engine.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Propose Verdicts
// ============================================================================

/// Outcome of a propose call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// The proposed call may proceed.
    Allow,
    /// The proposed call is denied by policy.
    Deny,
    /// The proposed call requires out-of-band escalation.
    Escalate,
}

impl DecisionOutcome {
    /// Returns the lowercase wire name of this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Escalate => "escalate",
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict returned by a propose call.
///
/// # Invariants
/// - `allowed` is true exactly when `outcome` is [`DecisionOutcome::Allow`].
/// - Deny and escalate verdicts are returned as values, never raised.
/// - `rule_id` and `reason` carry untrusted engine text when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the proposed call may proceed.
    pub allowed: bool,
    /// Policy outcome for the proposed call.
    pub outcome: DecisionOutcome,
    /// Event identifier assigned to the proposed call.
    pub event_id: EventId,
    /// Identifier of the rule that produced a non-allow verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Human-readable explanation for a non-allow verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    /// Builds the allow verdict for a proposed call.
    #[must_use]
    pub const fn allow(event_id: EventId) -> Self {
        Self {
            allowed: true,
            outcome: DecisionOutcome::Allow,
            event_id,
            rule_id: None,
            reason: None,
        }
    }
}

// ============================================================================
// SECTION: Explain Results
// ============================================================================

/// Trace explanation for an event.
///
/// # Invariants
/// - `trace_chain` entries are schema-less event descriptors preserved
///   exactly as the engine returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainResult {
    /// Human-readable explanation text.
    #[serde(default)]
    pub text: String,
    /// Ordered chain of causally-linked event descriptors.
    #[serde(default)]
    pub trace_chain: Vec<Value>,
}

// ============================================================================
// SECTION: Tool Registration
// ============================================================================

/// Risk tier declared for a registered tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Low-risk tool.
    Low,
    /// Medium-risk tool (engine default).
    #[default]
    Medium,
    /// High-risk tool.
    High,
}

impl RiskTier {
    /// Returns the lowercase wire name of this risk tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a tool's risk tier and optional category.
///
/// # Invariants
/// - `category` is optional; registration without one is valid.
/// - Write-once-per-name semantics are engine policy, not enforced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistration {
    /// Tool name as it will appear in propose calls.
    pub name: String,
    /// Declared risk tier.
    pub risk: RiskTier,
    /// Optional tool category.
    pub category: Option<String>,
}

impl ToolRegistration {
    /// Creates a registration with the given name and risk tier.
    #[must_use]
    pub fn new(name: impl Into<String>, risk: RiskTier) -> Self {
        Self {
            name: name.into(),
            risk,
            category: None,
        }
    }

    /// Attaches a category to this registration.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Schema-less key/value metadata attached to ingested content.
///
/// Both transports share one canonical text encoding for this container (see
/// [`crate::canon`]), so metadata round-trips are well-defined regardless of
/// which transport carried them.
pub type Metadata = serde_json::Map<String, Value>;
