// crates/chitin-client/src/native.rs
// ============================================================================
// Module: Native Call Adapter
// Description: In-process transport over the chitin C ABI.
// Purpose: Own buffer marshalling, out-parameter decoding, and the two-step
//          last-error protocol behind a typed interface.
// Dependencies: chitin-core, libloading, serde_json, tracing
// ============================================================================

//! ## Overview
//! The native adapter loads the chitin shared library at runtime and invokes
//! the engine through its fixed C calling contract: every variable-length
//! argument travels as a (pointer, length) pair, every fallible call returns
//! a status code and writes its true result through an out-parameter, and on
//! any non-success status the engine's last structured error is fetched with
//! a follow-up call. Buffers handed back by the engine are owned by the
//! engine allocator and released with `chitin_free_string` on every exit
//! path, including decode failures, via a scoped guard.
//! Invariants:
//! - Raw pointers and lengths never escape this module.
//! - Absent arguments encode as the null pointer; empty arguments encode as
//!   a valid pointer with length zero.
//! - The engine handle is freed exactly once, in `Drop`.
//!
//! Security posture: the engine's error payloads are untrusted text; decode
//! failures degrade to lossy UTF-8 or fallback messages, never panics.

#![allow(
    unsafe_code,
    reason = "Calling the engine C ABI requires raw pointers; every block carries a safety \
              justification and the rest of the workspace stays unsafe-free."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::c_char;
use std::ffi::c_void;
use std::path::Path;
use std::ptr;
use std::slice;

use chitin_core::Decision;
use chitin_core::EngineError;
use chitin_core::EventId;
use chitin_core::ExplainResult;
use chitin_core::Metadata;
use chitin_core::Status;
use chitin_core::ToolRegistration;
use chitin_core::TrustLevel;
use chitin_core::outcome;
use chitin_core::to_canonical_json;
use chitin_core::tool_config_json;
use libloading::Library;

// ============================================================================
// SECTION: ABI Signatures
// ============================================================================

/// `chitin_engine_new(config_path, config_path_len) -> engine`
type EngineNewFn = unsafe extern "C" fn(*const c_char, usize) -> *mut c_void;
/// `chitin_engine_free(engine)`
type EngineFreeFn = unsafe extern "C" fn(*mut c_void);
/// `chitin_ingest(engine, content, len, trust, metadata, len, out_id) -> status`
type IngestFn = unsafe extern "C" fn(
    *mut c_void,
    *const c_char,
    usize,
    i32,
    *const c_char,
    usize,
    *mut u64,
) -> i32;
/// `chitin_propose(engine, tool, len, params, len, agent, len, sources, len, out_id) -> status`
type ProposeFn = unsafe extern "C" fn(
    *mut c_void,
    *const c_char,
    usize,
    *const c_char,
    usize,
    *const c_char,
    usize,
    *const u64,
    usize,
    *mut u64,
) -> i32;
/// `chitin_record_result(engine, tool_call_id, output, len, exit_code, out_id) -> status`
type RecordResultFn =
    unsafe extern "C" fn(*mut c_void, u64, *const c_char, usize, i32, *mut u64) -> i32;
/// `chitin_is_traced(engine, event_id, label, len, out_traced) -> status`
type IsTracedFn = unsafe extern "C" fn(*mut c_void, u64, *const c_char, usize, *mut i32) -> i32;
/// `chitin_set_label(engine, event_id, label, len) -> status`
type SetLabelFn = unsafe extern "C" fn(*mut c_void, u64, *const c_char, usize) -> i32;
/// `chitin_explain(engine, event_id, out_json, out_len) -> status`
type ExplainFn = unsafe extern "C" fn(*mut c_void, u64, *mut *mut c_char, *mut usize) -> i32;
/// `chitin_register_tool(engine, name, len, config_json, len) -> status`
type RegisterToolFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, usize, *const c_char, usize) -> i32;
/// `chitin_last_error(out_json, out_len) -> status`
type LastErrorFn = unsafe extern "C" fn(*mut *mut c_char, *mut usize) -> i32;
/// `chitin_free_string(ptr, len)`
type FreeStringFn = unsafe extern "C" fn(*mut c_char, usize);

// ============================================================================
// SECTION: Symbol Table
// ============================================================================

/// Function pointers resolved from the loaded engine library.
///
/// # Invariants
/// - `_library` outlives every pointer resolved from it.
struct NativeApi {
    /// Engine constructor.
    engine_new: EngineNewFn,
    /// Engine destructor.
    engine_free: EngineFreeFn,
    /// Content ingestion call.
    ingest: IngestFn,
    /// Tool-call proposal call.
    propose: ProposeFn,
    /// Tool-result recording call.
    record_result: RecordResultFn,
    /// Trace membership query call.
    is_traced: IsTracedFn,
    /// Label attachment call.
    set_label: SetLabelFn,
    /// Trace explanation call.
    explain: ExplainFn,
    /// Tool registration call.
    register_tool: RegisterToolFn,
    /// Structured last-error fetch call.
    last_error: LastErrorFn,
    /// Engine-owned buffer release call.
    free_string: FreeStringFn,
    /// Keeps the shared library mapped for the lifetime of the symbols.
    _library: Library,
}

/// Resolves one exported symbol into a raw function pointer.
fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, String> {
    // SAFETY: the alias `T` mirrors the declaration in the engine header for
    // `name`; the engine ships both sides of this contract.
    let resolved = unsafe { library.get::<T>(name) }
        .map_err(|err| format!("missing symbol {}: {err}", String::from_utf8_lossy(name)))?;
    Ok(*resolved)
}

impl NativeApi {
    /// Loads the engine library and resolves the full symbol table.
    ///
    /// # Errors
    ///
    /// Returns the unavailability reason as a string; the caller treats this
    /// as "native unavailable" and may fall back to the RPC transport.
    fn load(path: &Path) -> Result<Self, String> {
        // SAFETY: the library's initialization routines are the engine's own;
        // loading it is the documented way to embed the engine in-process.
        let library = unsafe { Library::new(path) }
            .map_err(|err| format!("failed to load {}: {err}", path.display()))?;
        Ok(Self {
            engine_new: symbol::<EngineNewFn>(&library, b"chitin_engine_new")?,
            engine_free: symbol::<EngineFreeFn>(&library, b"chitin_engine_free")?,
            ingest: symbol::<IngestFn>(&library, b"chitin_ingest")?,
            propose: symbol::<ProposeFn>(&library, b"chitin_propose")?,
            record_result: symbol::<RecordResultFn>(&library, b"chitin_record_result")?,
            is_traced: symbol::<IsTracedFn>(&library, b"chitin_is_traced")?,
            set_label: symbol::<SetLabelFn>(&library, b"chitin_set_label")?,
            explain: symbol::<ExplainFn>(&library, b"chitin_explain")?,
            register_tool: symbol::<RegisterToolFn>(&library, b"chitin_register_tool")?,
            last_error: symbol::<LastErrorFn>(&library, b"chitin_last_error")?,
            free_string: symbol::<FreeStringFn>(&library, b"chitin_free_string")?,
            _library: library,
        })
    }

    /// Decodes an engine-owned buffer and releases it on every path.
    ///
    /// Returns `None` for a null pointer. A non-null, zero-length buffer
    /// decodes as the empty string.
    fn take_string(&self, ptr: *mut c_char, len: usize) -> Option<String> {
        let buffer = EngineBuffer {
            api: self,
            ptr,
            len,
        };
        buffer.decode()
    }

    /// Fetches the engine's last structured error via the follow-up call.
    ///
    /// Mirrors the engine contract: a `NOT_FOUND` status or a null buffer
    /// means no error is recorded, yielding the fallback text.
    fn fetch_last_error(&self) -> String {
        let mut out_ptr: *mut c_char = ptr::null_mut();
        let mut out_len: usize = 0;
        // SAFETY: the out-parameters point at live stack slots for the
        // duration of the call.
        let status = unsafe { (self.last_error)(&raw mut out_ptr, &raw mut out_len) };
        if status == Status::NotFound.as_raw() {
            return "unknown error".to_string();
        }
        self.take_string(out_ptr, out_len).unwrap_or_else(|| "unknown error".to_string())
    }
}

// ============================================================================
// SECTION: Buffer Guard
// ============================================================================

/// Scoped owner of an engine-allocated buffer.
///
/// # Invariants
/// - The buffer is released exactly once, in `Drop`, on every exit path.
struct EngineBuffer<'api> {
    /// Symbol table providing the release call.
    api: &'api NativeApi,
    /// Buffer start, or null when the engine returned nothing.
    ptr: *mut c_char,
    /// Buffer length in bytes.
    len: usize,
}

impl EngineBuffer<'_> {
    /// Copies the buffer contents out as lossy UTF-8.
    fn decode(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        if self.len == 0 {
            return Some(String::new());
        }
        // SAFETY: the engine guarantees `ptr` is valid for `len` bytes until
        // released, and the guard has not released it yet.
        let bytes = unsafe { slice::from_raw_parts(self.ptr.cast::<u8>(), self.len) };
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl Drop for EngineBuffer<'_> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: `ptr`/`len` were produced by the engine and are
            // released here and nowhere else.
            unsafe { (self.api.free_string)(self.ptr, self.len) };
        }
    }
}

// ============================================================================
// SECTION: Argument Encoding
// ============================================================================

/// Encodes an optional string as a (pointer, length) pair.
///
/// Absent is distinct from empty: `None` encodes as the null pointer with
/// length zero, while `Some("")` encodes as a valid non-null pointer with
/// length zero.
fn str_arg(value: Option<&str>) -> (*const c_char, usize) {
    value.map_or((ptr::null(), 0), |text| (text.as_ptr().cast::<c_char>(), text.len()))
}

/// Encodes an identifier slice as a (pointer, length) pair.
///
/// An empty slice collapses to the absent encoding, matching the engine's
/// treatment of "no input sources".
fn id_slice_arg(values: &[u64]) -> (*const u64, usize) {
    if values.is_empty() {
        (ptr::null(), 0)
    } else {
        (values.as_ptr(), values.len())
    }
}

// ============================================================================
// SECTION: Native Engine
// ============================================================================

/// One in-process engine instance reached through the C ABI.
///
/// # Invariants
/// - `handle` is non-null for the life of the value and freed exactly once.
/// - Callers serialize all access; the session holds this behind its lock.
pub(crate) struct NativeEngine {
    /// Resolved symbol table (keeps the library mapped).
    api: NativeApi,
    /// Opaque engine instance handle.
    handle: *mut c_void,
}

// SAFETY: the engine handle is an opaque heap pointer owned exclusively by
// this value, the ABI attaches no thread affinity to handles, and the owning
// session serializes every call through its lock.
unsafe impl Send for NativeEngine {}

impl NativeEngine {
    /// Loads the library at `library_path` and constructs an engine instance.
    ///
    /// `config_path = None` selects the engine's embedded default policy.
    ///
    /// # Errors
    ///
    /// Returns the unavailability reason as a string (load failure, missing
    /// symbol, or construction failure); the caller treats any of these as
    /// "native unavailable".
    pub(crate) fn open(library_path: &Path, config_path: Option<&Path>) -> Result<Self, String> {
        let api = NativeApi::load(library_path)?;
        let config = config_path.map(|path| path.to_string_lossy().into_owned());
        let (config_ptr, config_len) = str_arg(config.as_deref());
        // SAFETY: `config_ptr` is either null or valid for `config_len` bytes
        // for the duration of the call.
        let handle = unsafe { (api.engine_new)(config_ptr, config_len) };
        if handle.is_null() {
            return Err(format!("engine construction failed: {}", api.fetch_last_error()));
        }
        Ok(Self {
            api,
            handle,
        })
    }

    /// Records a content item and returns its event identifier.
    pub(crate) fn ingest(
        &self,
        content: &str,
        trust: TrustLevel,
        metadata: Option<&Metadata>,
    ) -> Result<EventId, EngineError> {
        let metadata_json = metadata.map(to_canonical_json).transpose()?;
        let (content_ptr, content_len) = str_arg(Some(content));
        let (meta_ptr, meta_len) = str_arg(metadata_json.as_deref());
        let mut event_id: u64 = 0;
        // SAFETY: all pointers are null-or-valid for their paired lengths and
        // `event_id` is a live out-parameter slot for the call.
        let status = unsafe {
            (self.api.ingest)(
                self.handle,
                content_ptr,
                content_len,
                trust.ordinal(),
                meta_ptr,
                meta_len,
                &raw mut event_id,
            )
        };
        outcome::require_ok("ingest", status, || self.api.fetch_last_error())?;
        Ok(EventId::new(event_id))
    }

    /// Proposes a tool call and maps the status onto a [`Decision`].
    pub(crate) fn propose(
        &self,
        tool: &str,
        params: &str,
        agent_id: Option<&str>,
        input_sources: Option<&[EventId]>,
    ) -> Result<Decision, EngineError> {
        let (tool_ptr, tool_len) = str_arg(Some(tool));
        let (params_ptr, params_len) = str_arg(Some(params));
        let (agent_ptr, agent_len) = str_arg(agent_id);
        let raw_sources: Vec<u64> =
            input_sources.unwrap_or_default().iter().map(|id| id.get()).collect();
        let (sources_ptr, sources_len) = id_slice_arg(&raw_sources);
        let mut event_id: u64 = 0;
        // SAFETY: all pointers are null-or-valid for their paired lengths and
        // `event_id` is a live out-parameter slot for the call.
        let status = unsafe {
            (self.api.propose)(
                self.handle,
                tool_ptr,
                tool_len,
                params_ptr,
                params_len,
                agent_ptr,
                agent_len,
                sources_ptr,
                sources_len,
                &raw mut event_id,
            )
        };
        outcome::propose_decision(status, EventId::new(event_id), || self.api.fetch_last_error())
    }

    /// Records a tool result and returns the new event identifier.
    pub(crate) fn record_result(
        &self,
        tool_call_id: EventId,
        output: &str,
        exit_code: i32,
    ) -> Result<EventId, EngineError> {
        let (output_ptr, output_len) = str_arg(Some(output));
        let mut event_id: u64 = 0;
        // SAFETY: `output_ptr` is valid for `output_len` bytes and `event_id`
        // is a live out-parameter slot for the call.
        let status = unsafe {
            (self.api.record_result)(
                self.handle,
                tool_call_id.get(),
                output_ptr,
                output_len,
                exit_code,
                &raw mut event_id,
            )
        };
        outcome::require_ok("record_result", status, || self.api.fetch_last_error())?;
        Ok(EventId::new(event_id))
    }

    /// Reports whether an event traces back to a label.
    pub(crate) fn is_traced(&self, event_id: EventId, label: &str) -> Result<bool, EngineError> {
        let (label_ptr, label_len) = str_arg(Some(label));
        let mut traced: i32 = 0;
        // SAFETY: `label_ptr` is valid for `label_len` bytes and `traced` is
        // a live out-parameter slot for the call.
        let status = unsafe {
            (self.api.is_traced)(self.handle, event_id.get(), label_ptr, label_len, &raw mut traced)
        };
        outcome::require_ok("is_traced", status, || self.api.fetch_last_error())?;
        Ok(traced != 0)
    }

    /// Attaches a trace label to an event.
    pub(crate) fn set_label(&self, event_id: EventId, label: &str) -> Result<(), EngineError> {
        let (label_ptr, label_len) = str_arg(Some(label));
        // SAFETY: `label_ptr` is valid for `label_len` bytes for the call.
        let status =
            unsafe { (self.api.set_label)(self.handle, event_id.get(), label_ptr, label_len) };
        outcome::require_ok("set_label", status, || self.api.fetch_last_error())
    }

    /// Fetches the trace explanation for an event.
    pub(crate) fn explain(&self, event_id: EventId) -> Result<ExplainResult, EngineError> {
        let mut out_ptr: *mut c_char = ptr::null_mut();
        let mut out_len: usize = 0;
        // SAFETY: the out-parameters point at live stack slots for the
        // duration of the call.
        let status = unsafe {
            (self.api.explain)(self.handle, event_id.get(), &raw mut out_ptr, &raw mut out_len)
        };
        outcome::require_ok("explain", status, || self.api.fetch_last_error())?;
        let Some(payload) = self.api.take_string(out_ptr, out_len).filter(|text| !text.is_empty())
        else {
            return Ok(ExplainResult::default());
        };
        match serde_json::from_str::<ExplainResult>(&payload) {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(error = %err, "explain payload was not structured json");
                Ok(ExplainResult {
                    text: payload,
                    trace_chain: Vec::new(),
                })
            }
        }
    }

    /// Registers a tool's risk tier and optional category.
    pub(crate) fn register_tool(&self, registration: &ToolRegistration) -> Result<(), EngineError> {
        let config_json = tool_config_json(registration)?;
        let (name_ptr, name_len) = str_arg(Some(&registration.name));
        let (config_ptr, config_len) = str_arg(Some(&config_json));
        // SAFETY: both pointers are valid for their paired lengths for the
        // call.
        let status = unsafe {
            (self.api.register_tool)(self.handle, name_ptr, name_len, config_ptr, config_len)
        };
        outcome::require_ok("register_tool", status, || self.api.fetch_last_error())
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            // SAFETY: `handle` was returned by `engine_new` and is freed here
            // and nowhere else.
            unsafe { (self.api.engine_free)(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}
