// crates/chitin-client/tests/common/mod.rs
// ============================================================================
// Module: Client Test Helpers
// Description: Loopback sidecar scaffolding shared by integration tests.
// Purpose: Serve canned responses and capture request paths and bodies.
// Dependencies: chitin-client, tempfile, tiny_http
// ============================================================================

//! Shared helpers for driving the client against a loopback sidecar.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Each integration test binary uses a subset of these helpers, and test-only \
              panic-based assertions are permitted."
)]

use std::thread;

use chitin_client::Engine;
use chitin_client::EngineConfig;
use chitin_client::Transport;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

/// One captured sidecar exchange: request path and raw request body.
pub struct CapturedRequest {
    /// Request path as received (for example `/ingest`).
    pub path: String,
    /// Raw request body text.
    pub body: String,
}

/// Spawns a loopback sidecar serving `responses` in order.
///
/// Returns the base URL and a handle whose join yields the captured
/// requests. The server stops after the last canned response.
pub fn spawn_sidecar(
    responses: Vec<(u16, String)>,
) -> (String, thread::JoinHandle<Vec<CapturedRequest>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = format!("http://{addr}");
    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        for (code, body) in responses {
            let Ok(mut request) = server.recv() else {
                break;
            };
            let mut content = String::new();
            let _ = request.as_reader().read_to_string(&mut content);
            captured.push(CapturedRequest {
                path: request.url().to_string(),
                body: content,
            });
            let response = Response::from_string(body).with_status_code(StatusCode(code));
            let _ = request.respond(response);
        }
        captured
    });
    (url, handle)
}

/// Writes a file that exists but can never load as a shared library.
pub fn bogus_library() -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"not a shared library").unwrap();
    file
}

/// Opens a session that is guaranteed to select the RPC transport.
///
/// The native override points at an existing non-library file, so the load
/// fails cleanly and construction falls back to the sidecar.
pub fn open_rpc_engine(sidecar_url: &str) -> Engine {
    let bogus = bogus_library();
    let config = EngineConfig::default()
        .with_library_path(bogus.path())
        .with_sidecar_url(sidecar_url);
    let engine = Engine::open_with(config).unwrap();
    assert_eq!(engine.transport(), Some(Transport::Rpc));
    engine
}
