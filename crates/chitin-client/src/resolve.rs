// crates/chitin-client/src/resolve.rs
// ============================================================================
// Module: Library Resolver
// Description: Locates the chitin shared library across deployment layouts.
// Purpose: Make explicit configuration, packaged installs, and local engine
//          builds all work without further setup.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Resolution is a deterministic, ordered search with first-match-wins:
//!
//! 1. an explicit override path, used only if it names an existing file;
//! 2. the platform artifact bundled alongside the installed client binary;
//! 3. a local engine build under `./target/release/`;
//! 4. a sibling `chitin-engine` checkout's release build;
//! 5. the bare platform artifact name, deferring to the dynamic loader's
//!    own search path.
//!
//! Explicit configuration always wins, packaged distribution works out of
//! the box, and development against a freshly built engine needs no
//! configuration. Resolution itself never fails; loading the resolved path
//! may fail, which callers treat as "native unavailable", not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::path::Path;
use std::path::PathBuf;

// ============================================================================
// SECTION: Platform Artifact Names
// ============================================================================

/// Returns the shared-library artifact name for the current platform.
#[must_use]
pub(crate) const fn platform_library_name() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "chitin.dll"
    }
    #[cfg(target_os = "macos")]
    {
        "libchitin.dylib"
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        "libchitin.so"
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the path handed to the dynamic loader.
///
/// `override_path` is the explicit library path from configuration or the
/// environment; it is honored only when it names an existing file, so a
/// stale override falls through to the remaining locations.
#[must_use]
pub(crate) fn resolve_library(override_path: Option<&Path>) -> PathBuf {
    let name = platform_library_name();

    // 1. Explicit override.
    if let Some(path) = override_path
        && path.is_file()
    {
        return std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    }

    // 2. Bundled alongside the installed client binary.
    if let Ok(exe) = env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let bundled = dir.join(name);
        if bundled.is_file() {
            return bundled;
        }
    }

    // 3. Local engine build output.
    let local = Path::new("target").join("release").join(name);
    if local.is_file() {
        return local;
    }

    // 4. Sibling engine checkout.
    let sibling = Path::new("..").join("chitin-engine").join("target").join("release").join(name);
    if sibling.is_file() {
        return sibling;
    }

    // 5. Defer to the platform loader's search path.
    PathBuf::from(name)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::io::Write;
    use std::path::Path;
    use std::path::PathBuf;

    use super::platform_library_name;
    use super::resolve_library;

    /// The platform artifact name matches the target family.
    #[test]
    fn platform_name_matches_target() {
        let name = platform_library_name();
        #[cfg(target_os = "windows")]
        assert_eq!(name, "chitin.dll");
        #[cfg(target_os = "macos")]
        assert_eq!(name, "libchitin.dylib");
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        assert_eq!(name, "libchitin.so");
    }

    /// An override naming an existing file wins and is absolutized.
    #[test]
    fn existing_override_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(platform_library_name());
        let mut file = std::fs::File::create(&path).expect("create override");
        file.write_all(b"not a real library").expect("write override");

        let resolved = resolve_library(Some(&path));
        assert!(resolved.is_absolute());
        assert_eq!(resolved.file_name(), path.file_name());
    }

    /// An override naming a missing file falls through the search order.
    #[test]
    fn missing_override_falls_through() {
        let ghost = PathBuf::from("/nonexistent/chitin/libchitin.so");
        let resolved = resolve_library(Some(&ghost));
        assert_ne!(resolved, ghost);
    }

    /// With no candidate present the bare artifact name is returned for the
    /// platform loader.
    #[test]
    fn bare_name_when_nothing_found() {
        let resolved = resolve_library(Some(Path::new("/nonexistent/override")));
        if !resolved.is_absolute() && resolved.components().count() == 1 {
            assert_eq!(resolved, PathBuf::from(platform_library_name()));
        }
    }
}
