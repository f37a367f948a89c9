// crates/chitin-client/src/rpc.rs
// ============================================================================
// Module: RPC Adapter
// Description: Sidecar transport over blocking HTTP JSON exchanges.
// Purpose: Mirror the native transport's semantics across one POST per
//          operation.
// Dependencies: chitin-core, reqwest, serde, serde_json, url
// ============================================================================

//! ## Overview
//! The RPC adapter talks to the chitin sidecar: one POST per operation with a
//! JSON body and a JSON (or empty) response. Unlike the native transport, the
//! sidecar answers 2xx even for policy verdicts — propose responses carry the
//! verdict fields directly, with no follow-up error fetch. For every other
//! operation, a non-success status embedded in the response body funnels
//! through the same outcome mapper as the native path.
//! Invariants:
//! - Connection-level failures classify as internal errors.
//! - Non-2xx responses decode as structured error payloads when possible and
//!   default to internal errors otherwise.
//! - Response bodies are read under a hard byte limit and fail closed.
//! - Redirects are never followed.
//!
//! Security posture: sidecar responses are untrusted input; parsing fails
//! closed and oversized bodies are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use chitin_core::Decision;
use chitin_core::DecisionOutcome;
use chitin_core::EngineError;
use chitin_core::EventId;
use chitin_core::ExplainResult;
use chitin_core::Metadata;
use chitin_core::RiskTier;
use chitin_core::Status;
use chitin_core::ToolRegistration;
use chitin_core::TrustLevel;
use chitin_core::outcome;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum sidecar response body size accepted by the adapter.
pub(crate) const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Wire Structures
// ============================================================================

/// `/ingest` request body.
#[derive(Debug, Serialize)]
struct IngestRequest<'a> {
    /// Content text to record.
    content: &'a str,
    /// Trust level ordinal.
    trust: i32,
    /// Optional structured metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Metadata>,
}

/// `/propose` request body.
#[derive(Debug, Serialize)]
struct ProposeRequest<'a> {
    /// Tool name being proposed.
    tool: &'a str,
    /// Opaque parameter text.
    params: &'a str,
    /// Optional proposing agent identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_id: Option<&'a str>,
    /// Optional input event identifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    input_sources: Option<&'a [EventId]>,
}

/// `/record_result` request body.
#[derive(Debug, Serialize)]
struct RecordResultRequest<'a> {
    /// Event identifier of the proposed tool call.
    tool_call_id: EventId,
    /// Tool output text.
    output: &'a str,
    /// Tool exit code.
    exit_code: i32,
}

/// `/is_traced` and `/set_label` request body.
#[derive(Debug, Serialize)]
struct LabelRequest<'a> {
    /// Target event identifier.
    event_id: EventId,
    /// Label name.
    label: &'a str,
}

/// `/explain` request body.
#[derive(Debug, Serialize)]
struct ExplainRequest {
    /// Target event identifier.
    event_id: EventId,
}

/// `/register_tool` request body.
#[derive(Debug, Serialize)]
struct RegisterToolRequest<'a> {
    /// Tool name to register.
    tool_name: &'a str,
    /// Declared risk tier.
    risk: RiskTier,
    /// Optional tool category.
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

/// Response envelope carrying an event identifier.
#[derive(Debug, Deserialize)]
struct EventIdResponse {
    /// Embedded engine status (absent means success).
    #[serde(default)]
    status: i32,
    /// Error text accompanying a non-success status.
    #[serde(default)]
    error: Option<String>,
    /// Newly assigned event identifier.
    #[serde(default)]
    event_id: Option<EventId>,
}

/// `/is_traced` response body.
#[derive(Debug, Deserialize)]
struct IsTracedResponse {
    /// Embedded engine status (absent means success).
    #[serde(default)]
    status: i32,
    /// Error text accompanying a non-success status.
    #[serde(default)]
    error: Option<String>,
    /// Whether the event traces to the label.
    #[serde(default)]
    traced: bool,
}

/// `/explain` response body.
#[derive(Debug, Deserialize)]
struct ExplainResponse {
    /// Embedded engine status (absent means success).
    #[serde(default)]
    status: i32,
    /// Error text accompanying a non-success status.
    #[serde(default)]
    error: Option<String>,
    /// Human-readable explanation text.
    #[serde(default)]
    text: String,
    /// Ordered chain of causally-linked event descriptors.
    #[serde(default)]
    trace_chain: Vec<Value>,
}

/// `/propose` response body (always 2xx, verdict carried as data).
#[derive(Debug, Deserialize)]
struct ProposeResponse {
    /// Whether the proposed call may proceed.
    #[serde(default)]
    allowed: bool,
    /// Policy outcome (absent defaults to deny).
    #[serde(default)]
    outcome: Option<DecisionOutcome>,
    /// Event identifier assigned to the proposed call.
    #[serde(default)]
    event_id: Option<EventId>,
    /// Identifier of the rule that fired.
    #[serde(default)]
    rule_id: Option<String>,
    /// Human-readable verdict reason.
    #[serde(default)]
    reason: Option<String>,
}

/// Error payload decoded from non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    /// Embedded engine status.
    #[serde(default)]
    status: Option<i32>,
    /// Error text.
    #[serde(default)]
    error: Option<String>,
}

// ============================================================================
// SECTION: RPC Engine
// ============================================================================

/// One sidecar-backed engine connection.
///
/// # Invariants
/// - `base_url` has no trailing slash; endpoint paths start with one.
pub(crate) struct RpcEngine {
    /// Blocking HTTP client with the configured timeout.
    client: Client,
    /// Normalized sidecar base URL.
    base_url: String,
}

impl RpcEngine {
    /// Validates the sidecar target and builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns the unavailability reason as a string (invalid URL or client
    /// construction failure); the caller folds it into the session
    /// construction error.
    pub(crate) fn connect(target: &str, timeout: Duration) -> Result<Self, String> {
        let parsed =
            Url::parse(target).map_err(|err| format!("invalid sidecar url {target}: {err}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported sidecar url scheme: {}", parsed.scheme()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| format!("failed to build sidecar http client: {err}"))?;
        Ok(Self {
            client,
            base_url: target.trim_end_matches('/').to_string(),
        })
    }

    /// Records a content item and returns its event identifier.
    pub(crate) fn ingest(
        &self,
        content: &str,
        trust: TrustLevel,
        metadata: Option<&Metadata>,
    ) -> Result<EventId, EngineError> {
        let body = self.post(
            "/ingest",
            &IngestRequest {
                content,
                trust: trust.ordinal(),
                metadata,
            },
        )?;
        decode_event_id("ingest", &body)
    }

    /// Proposes a tool call and decodes the verdict fields.
    pub(crate) fn propose(
        &self,
        tool: &str,
        params: &str,
        agent_id: Option<&str>,
        input_sources: Option<&[EventId]>,
    ) -> Result<Decision, EngineError> {
        let body = self.post(
            "/propose",
            &ProposeRequest {
                tool,
                params,
                agent_id,
                input_sources,
            },
        )?;
        let response: ProposeResponse = decode_body("propose", &body)?;
        let event_id = response
            .event_id
            .ok_or_else(|| EngineError::Internal("propose response missing event_id".to_string()))?;
        Ok(Decision {
            allowed: response.allowed,
            outcome: response.outcome.unwrap_or(DecisionOutcome::Deny),
            event_id,
            rule_id: response.rule_id,
            reason: response.reason,
        })
    }

    /// Records a tool result and returns the new event identifier.
    pub(crate) fn record_result(
        &self,
        tool_call_id: EventId,
        output: &str,
        exit_code: i32,
    ) -> Result<EventId, EngineError> {
        let body = self.post(
            "/record_result",
            &RecordResultRequest {
                tool_call_id,
                output,
                exit_code,
            },
        )?;
        decode_event_id("record_result", &body)
    }

    /// Reports whether an event traces back to a label.
    pub(crate) fn is_traced(&self, event_id: EventId, label: &str) -> Result<bool, EngineError> {
        let body = self.post(
            "/is_traced",
            &LabelRequest {
                event_id,
                label,
            },
        )?;
        let response: IsTracedResponse = decode_body("is_traced", &body)?;
        require_body_ok("is_traced", response.status, response.error)?;
        Ok(response.traced)
    }

    /// Attaches a trace label to an event.
    pub(crate) fn set_label(&self, event_id: EventId, label: &str) -> Result<(), EngineError> {
        let body = self.post(
            "/set_label",
            &LabelRequest {
                event_id,
                label,
            },
        )?;
        if body.is_empty() {
            return Ok(());
        }
        let response: EventIdResponse = decode_body("set_label", &body)?;
        require_body_ok("set_label", response.status, response.error)
    }

    /// Fetches the trace explanation for an event.
    pub(crate) fn explain(&self, event_id: EventId) -> Result<ExplainResult, EngineError> {
        let body = self.post(
            "/explain",
            &ExplainRequest {
                event_id,
            },
        )?;
        let response: ExplainResponse = decode_body("explain", &body)?;
        require_body_ok("explain", response.status, response.error)?;
        Ok(ExplainResult {
            text: response.text,
            trace_chain: response.trace_chain,
        })
    }

    /// Registers a tool's risk tier and optional category.
    pub(crate) fn register_tool(&self, registration: &ToolRegistration) -> Result<(), EngineError> {
        let body = self.post(
            "/register_tool",
            &RegisterToolRequest {
                tool_name: &registration.name,
                risk: registration.risk,
                category: registration.category.as_deref(),
            },
        )?;
        // 204-style acknowledgements arrive with an empty body.
        if body.is_empty() {
            return Ok(());
        }
        let response: EventIdResponse = decode_body("register_tool", &body)?;
        require_body_ok("register_tool", response.status, response.error)
    }

    /// Sends one POST exchange and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Internal`] for connection failures, oversized
    /// bodies, and undecodable non-2xx responses; structured non-2xx payloads
    /// map onto the canonical taxonomy.
    fn post<T: Serialize>(&self, path: &str, request: &T) -> Result<Vec<u8>, EngineError> {
        let operation = path.trim_start_matches('/');
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(|err| EngineError::Internal(format!("sidecar request failed: {err}")))?;
        let status = response.status();
        let body = read_limited(response)?;
        if !status.is_success() {
            return Err(decode_http_error(operation, status, &body));
        }
        Ok(body)
    }
}

// ============================================================================
// SECTION: Response Decoding
// ============================================================================

/// Reads a response body while enforcing the hard byte limit.
fn read_limited(response: reqwest::blocking::Response) -> Result<Vec<u8>, EngineError> {
    let limit = u64::try_from(MAX_RESPONSE_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut body = Vec::new();
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut body)
        .map_err(|err| EngineError::Internal(format!("failed to read sidecar response: {err}")))?;
    if body.len() > MAX_RESPONSE_BYTES {
        return Err(EngineError::Internal(format!(
            "sidecar response exceeds size limit ({MAX_RESPONSE_BYTES} bytes)"
        )));
    }
    Ok(body)
}

/// Decodes a JSON response body into the expected shape.
fn decode_body<'de, T: Deserialize<'de>>(
    operation: &str,
    body: &'de [u8],
) -> Result<T, EngineError> {
    serde_json::from_slice(body).map_err(|err| {
        EngineError::Internal(format!("invalid sidecar response for {operation}: {err}"))
    })
}

/// Funnels an embedded body status through the outcome mapper.
fn require_body_ok(
    operation: &str,
    status: i32,
    error: Option<String>,
) -> Result<(), EngineError> {
    outcome::require_ok(operation, status, || {
        error.unwrap_or_else(|| format!("{operation} failed"))
    })
}

/// Decodes an event-id envelope, enforcing status and presence.
fn decode_event_id(operation: &str, body: &[u8]) -> Result<EventId, EngineError> {
    let response: EventIdResponse = decode_body(operation, body)?;
    require_body_ok(operation, response.status, response.error)?;
    response
        .event_id
        .ok_or_else(|| EngineError::Internal(format!("{operation} response missing event_id")))
}

/// Maps a non-2xx response onto the canonical error taxonomy.
///
/// Structured payloads (`status` + `error` fields) classify through the
/// outcome mapper; anything else defaults to an internal error.
fn decode_http_error(operation: &str, status: StatusCode, body: &[u8]) -> EngineError {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body)
        && (envelope.status.is_some() || envelope.error.is_some())
    {
        let code = envelope.status.unwrap_or(Status::Internal.as_raw());
        let message = envelope
            .error
            .unwrap_or_else(|| format!("{operation} failed with http status {status}"));
        if let Err(error) = outcome::require_ok(operation, code, || message) {
            return error;
        }
    }
    EngineError::Internal(format!("sidecar returned http status {status} for {operation}"))
}
