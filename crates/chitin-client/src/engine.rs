// crates/chitin-client/src/engine.rs
// ============================================================================
// Module: Engine Session
// Description: Dual-transport session facade for the chitin engine.
// Purpose: Select a transport once at construction and dispatch every
//          operation through it with identical semantics.
// Dependencies: chitin-core, tracing
// ============================================================================

//! ## Overview
//! An [`Engine`] is one open connection to the chitin engine. Construction
//! tries the native transport first (resolve, load, construct) and threads
//! the failure reason through to the RPC fallback when a sidecar target is
//! configured; native unavailability is a normal result, never a panic. After
//! construction, exactly one transport is active and every operation
//! dispatches through it; the outcome mapper in `chitin-core` guarantees both
//! transports produce identical return shapes.
//! Invariants:
//! - Operations on a closed session fail with [`EngineError::Closed`] and
//!   perform no transport call.
//! - At most one operation is in flight per session (internal exclusive
//!   lock); independent sessions share no state.
//! - Closing releases the native engine instance exactly once; close is
//!   idempotent, and dropping an unclosed session releases through the same
//!   path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;

use chitin_core::Decision;
use chitin_core::EngineError;
use chitin_core::EventId;
use chitin_core::ExplainResult;
use chitin_core::Metadata;
use chitin_core::ToolRegistration;
use chitin_core::TrustLevel;

use crate::config::EngineConfig;
use crate::config::remediation_message;
use crate::native::NativeEngine;
use crate::resolve::resolve_library;
use crate::rpc::RpcEngine;

// ============================================================================
// SECTION: Transport Selection
// ============================================================================

/// Transport kinds an open session can be backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// In-process native library transport.
    Native,
    /// HTTP sidecar transport.
    Rpc,
}

/// Transport-specific backend implementations.
enum Backend {
    /// In-process native engine instance.
    Native(NativeEngine),
    /// Sidecar-backed engine connection.
    Rpc(RpcEngine),
    /// Call-counting stub used by session tests.
    #[cfg(test)]
    Stub(StubBackend),
}

impl Backend {
    /// Returns the transport kind of this backend.
    const fn transport(&self) -> Transport {
        match self {
            Self::Native(_) => Transport::Native,
            Self::Rpc(_) => Transport::Rpc,
            #[cfg(test)]
            Self::Stub(_) => Transport::Rpc,
        }
    }
}

/// Session state: open with one active backend, or terminally closed.
enum SessionState {
    /// Session is open and dispatching through the contained backend.
    Open(Backend),
    /// Session is closed; every operation fails without a transport call.
    Closed,
}

// ============================================================================
// SECTION: Engine Session
// ============================================================================

/// One open connection to the chitin engine.
///
/// # Invariants
/// - Exactly one transport is active for the lifetime of the session.
/// - All operations are serialized through the internal lock.
pub struct Engine {
    /// Lock-guarded session state.
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    /// Opens a session using environment-derived configuration.
    ///
    /// `config_path = None` selects the engine's embedded default policy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] when neither transport can be
    /// established; the message names both remediation paths.
    pub fn open(config_path: Option<&Path>) -> Result<Self, EngineError> {
        let mut config = EngineConfig::from_env();
        if let Some(path) = config_path {
            config.config_path = Some(path.to_path_buf());
        }
        Self::open_with(config)
    }

    /// Opens a session with explicit configuration.
    ///
    /// The native transport is tried first; on any native failure the RPC
    /// transport is tried when a sidecar target is configured.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] when neither transport can be
    /// established; the message names both remediation paths.
    pub fn open_with(config: EngineConfig) -> Result<Self, EngineError> {
        let library = resolve_library(config.library_path.as_deref());
        let native_failure = match NativeEngine::open(&library, config.config_path.as_deref()) {
            Ok(native) => {
                tracing::debug!(library = %library.display(), "native engine transport selected");
                return Ok(Self::from_backend(Backend::Native(native)));
            }
            Err(reason) => reason,
        };
        if let Some(target) = config.sidecar_url.as_deref() {
            match RpcEngine::connect(target, config.rpc_timeout) {
                Ok(rpc) => {
                    tracing::debug!(sidecar = target, "rpc sidecar transport selected");
                    return Ok(Self::from_backend(Backend::Rpc(rpc)));
                }
                Err(rpc_failure) => {
                    return Err(EngineError::Unavailable(format!(
                        "{native_failure}; {rpc_failure}; {}",
                        remediation_message()
                    )));
                }
            }
        }
        Err(EngineError::Unavailable(format!("{native_failure}; {}", remediation_message())))
    }

    /// Wraps a selected backend in a session.
    fn from_backend(backend: Backend) -> Self {
        Self {
            state: Mutex::new(SessionState::Open(backend)),
        }
    }

    /// Acquires the session lock.
    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Internal("engine session lock poisoned".to_string()))
    }

    /// Returns the active transport, or `None` once the session is closed.
    #[must_use]
    pub fn transport(&self) -> Option<Transport> {
        let guard = self.state.lock().ok()?;
        match &*guard {
            SessionState::Open(backend) => Some(backend.transport()),
            SessionState::Closed => None,
        }
    }

    /// Records a content item and returns its event identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is closed, the input is
    /// rejected, or the transport fails.
    pub fn ingest(
        &self,
        content: &str,
        trust: TrustLevel,
        metadata: Option<&Metadata>,
    ) -> Result<EventId, EngineError> {
        let guard = self.lock()?;
        match &*guard {
            SessionState::Closed => Err(EngineError::Closed),
            SessionState::Open(backend) => match backend {
                Backend::Native(native) => native.ingest(content, trust, metadata),
                Backend::Rpc(rpc) => rpc.ingest(content, trust, metadata),
                #[cfg(test)]
                Backend::Stub(stub) => stub.ingest(),
            },
        }
    }

    /// Proposes a tool call and returns the policy verdict.
    ///
    /// Deny and escalate verdicts are returned as [`Decision`] values, never
    /// as errors.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is closed, the input is
    /// rejected, or the transport fails — never for a policy verdict.
    pub fn propose(
        &self,
        tool: &str,
        params: &str,
        agent_id: Option<&str>,
        input_sources: Option<&[EventId]>,
    ) -> Result<Decision, EngineError> {
        let guard = self.lock()?;
        match &*guard {
            SessionState::Closed => Err(EngineError::Closed),
            SessionState::Open(backend) => match backend {
                Backend::Native(native) => native.propose(tool, params, agent_id, input_sources),
                Backend::Rpc(rpc) => rpc.propose(tool, params, agent_id, input_sources),
                #[cfg(test)]
                Backend::Stub(stub) => stub.propose(),
            },
        }
    }

    /// Records a tool result and returns the new event identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is closed, the referenced
    /// call does not exist, or the transport fails.
    pub fn record_result(
        &self,
        tool_call_id: EventId,
        output: &str,
        exit_code: i32,
    ) -> Result<EventId, EngineError> {
        let guard = self.lock()?;
        match &*guard {
            SessionState::Closed => Err(EngineError::Closed),
            SessionState::Open(backend) => match backend {
                Backend::Native(native) => native.record_result(tool_call_id, output, exit_code),
                Backend::Rpc(rpc) => rpc.record_result(tool_call_id, output, exit_code),
                #[cfg(test)]
                Backend::Stub(stub) => stub.record_result(),
            },
        }
    }

    /// Reports whether an event traces back to a label.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is closed, the event does
    /// not exist, or the transport fails.
    pub fn is_traced(&self, event_id: EventId, label: &str) -> Result<bool, EngineError> {
        let guard = self.lock()?;
        match &*guard {
            SessionState::Closed => Err(EngineError::Closed),
            SessionState::Open(backend) => match backend {
                Backend::Native(native) => native.is_traced(event_id, label),
                Backend::Rpc(rpc) => rpc.is_traced(event_id, label),
                #[cfg(test)]
                Backend::Stub(stub) => stub.is_traced(),
            },
        }
    }

    /// Attaches a trace label to an event; the engine propagates it to
    /// causally downstream events.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is closed, the event does
    /// not exist, or the transport fails.
    pub fn set_label(&self, event_id: EventId, label: &str) -> Result<(), EngineError> {
        let guard = self.lock()?;
        match &*guard {
            SessionState::Closed => Err(EngineError::Closed),
            SessionState::Open(backend) => match backend {
                Backend::Native(native) => native.set_label(event_id, label),
                Backend::Rpc(rpc) => rpc.set_label(event_id, label),
                #[cfg(test)]
                Backend::Stub(stub) => stub.set_label(),
            },
        }
    }

    /// Fetches the trace explanation for an event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is closed, the event does
    /// not exist, or the transport fails.
    pub fn explain(&self, event_id: EventId) -> Result<ExplainResult, EngineError> {
        let guard = self.lock()?;
        match &*guard {
            SessionState::Closed => Err(EngineError::Closed),
            SessionState::Open(backend) => match backend {
                Backend::Native(native) => native.explain(event_id),
                Backend::Rpc(rpc) => rpc.explain(event_id),
                #[cfg(test)]
                Backend::Stub(stub) => stub.explain(),
            },
        }
    }

    /// Registers a tool's risk tier and optional category.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the session is closed, the registration
    /// is rejected, or the transport fails.
    pub fn register_tool(&self, registration: &ToolRegistration) -> Result<(), EngineError> {
        let guard = self.lock()?;
        match &*guard {
            SessionState::Closed => Err(EngineError::Closed),
            SessionState::Open(backend) => match backend {
                Backend::Native(native) => native.register_tool(registration),
                Backend::Rpc(rpc) => rpc.register_tool(registration),
                #[cfg(test)]
                Backend::Stub(stub) => stub.register_tool(),
            },
        }
    }

    /// Closes the session, releasing the active transport.
    ///
    /// Idempotent: closing an already-closed session is a no-op. A native
    /// engine instance is released exactly once, here or in `Drop`.
    pub fn close(&self) {
        match self.state.lock() {
            Ok(mut guard) => {
                if matches!(&*guard, SessionState::Open(_)) {
                    tracing::debug!("engine session closed");
                }
                *guard = SessionState::Closed;
            }
            Err(_) => {
                tracing::warn!("close skipped: engine session lock poisoned");
            }
        }
    }
}

// ============================================================================
// SECTION: Test Support
// ============================================================================

/// Call-counting stub backend for session lifecycle tests.
#[cfg(test)]
struct StubBackend {
    /// Number of operations that reached the backend.
    calls: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

#[cfg(test)]
impl StubBackend {
    /// Bumps the call counter.
    fn touch(&self) {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    /// Stubbed ingest.
    fn ingest(&self) -> Result<EventId, EngineError> {
        self.touch();
        Ok(EventId::new(1))
    }

    /// Stubbed propose.
    fn propose(&self) -> Result<Decision, EngineError> {
        self.touch();
        Ok(Decision::allow(EventId::new(2)))
    }

    /// Stubbed record_result.
    fn record_result(&self) -> Result<EventId, EngineError> {
        self.touch();
        Ok(EventId::new(3))
    }

    /// Stubbed is_traced.
    fn is_traced(&self) -> Result<bool, EngineError> {
        self.touch();
        Ok(false)
    }

    /// Stubbed set_label.
    fn set_label(&self) -> Result<(), EngineError> {
        self.touch();
        Ok(())
    }

    /// Stubbed explain.
    fn explain(&self) -> Result<ExplainResult, EngineError> {
        self.touch();
        Ok(ExplainResult::default())
    }

    /// Stubbed register_tool.
    fn register_tool(&self) -> Result<(), EngineError> {
        self.touch();
        Ok(())
    }
}
