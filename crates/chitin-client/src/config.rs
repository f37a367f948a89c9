// crates/chitin-client/src/config.rs
// ============================================================================
// Module: Client Configuration
// Description: Session configuration with environment fallback.
// Purpose: Provide typed, bounded configuration for transport selection.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Session construction is parameterized by [`EngineConfig`]: the engine
//! policy configuration path, an explicit native library override, the RPC
//! sidecar target, and the RPC request timeout. [`EngineConfig::from_env`]
//! reads the environment exactly once; explicitly set fields always win over
//! environment values, and invalid timeout values fall back to the default
//! rather than failing construction.
//! Invariants:
//! - The RPC timeout is clamped to `[MIN_RPC_TIMEOUT_MS, MAX_RPC_TIMEOUT_MS]`.
//! - No module other than this one reads the process environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming an explicit native library path.
pub const LIB_PATH_ENV_VAR: &str = "CHITIN_LIB_PATH";
/// Environment variable naming the RPC sidecar base URL.
pub const SIDECAR_URL_ENV_VAR: &str = "CHITIN_SIDECAR_URL";
/// Environment variable overriding the RPC request timeout in milliseconds.
pub const RPC_TIMEOUT_ENV_VAR: &str = "CHITIN_RPC_TIMEOUT_MS";
/// Default RPC request timeout in milliseconds.
pub(crate) const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;
/// Minimum accepted RPC request timeout in milliseconds.
pub(crate) const MIN_RPC_TIMEOUT_MS: u64 = 100;
/// Maximum accepted RPC request timeout in milliseconds.
pub(crate) const MAX_RPC_TIMEOUT_MS: u64 = 300_000;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for one engine session.
///
/// # Invariants
/// - `config_path = None` means "use the engine's embedded default policy".
/// - `sidecar_url = None` disables the RPC fallback entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Engine policy configuration path passed to the native constructor.
    pub config_path: Option<PathBuf>,
    /// Explicit native library path, overriding resolver heuristics.
    pub library_path: Option<PathBuf>,
    /// RPC sidecar base URL used when the native transport is unavailable.
    pub sidecar_url: Option<String>,
    /// Request timeout applied to every RPC exchange. Native calls have no
    /// client-side timeout; their duration is bounded only by the engine.
    pub rpc_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            library_path: None,
            sidecar_url: None,
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
        }
    }
}

impl EngineConfig {
    /// Builds a configuration from the process environment.
    ///
    /// Reads [`LIB_PATH_ENV_VAR`], [`SIDECAR_URL_ENV_VAR`], and
    /// [`RPC_TIMEOUT_ENV_VAR`]. Unset variables leave the corresponding
    /// defaults in place.
    #[must_use]
    pub fn from_env() -> Self {
        let rpc_timeout = env::var(RPC_TIMEOUT_ENV_VAR)
            .ok()
            .and_then(|raw| parse_timeout_ms(&raw))
            .unwrap_or(Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS));
        Self {
            config_path: None,
            library_path: env::var_os(LIB_PATH_ENV_VAR).map(PathBuf::from),
            sidecar_url: env::var(SIDECAR_URL_ENV_VAR).ok().filter(|url| !url.is_empty()),
            rpc_timeout,
        }
    }

    /// Sets the engine policy configuration path.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Sets an explicit native library path.
    #[must_use]
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Sets the RPC sidecar base URL.
    #[must_use]
    pub fn with_sidecar_url(mut self, url: impl Into<String>) -> Self {
        self.sidecar_url = Some(url.into());
        self
    }

    /// Sets the RPC request timeout.
    #[must_use]
    pub const fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a millisecond timeout value, clamping it into the accepted range.
///
/// Returns `None` for unparseable input so callers can fall back to the
/// default.
fn parse_timeout_ms(raw: &str) -> Option<Duration> {
    let parsed = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_millis(parsed.clamp(MIN_RPC_TIMEOUT_MS, MAX_RPC_TIMEOUT_MS)))
}

/// Returns the remediation guidance listed in construction failures.
///
/// Both recovery paths are always named so operators can pick either one.
pub(crate) fn remediation_message() -> String {
    format!(
        "set {LIB_PATH_ENV_VAR} to the chitin shared library (libchitin.so / libchitin.dylib / \
         chitin.dll), install a build that bundles the library, or set {SIDECAR_URL_ENV_VAR} to \
         reach the rpc sidecar"
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
