// crates/chitin-cli/src/main.rs
// ============================================================================
// Module: Chitin CLI Entry Point
// Description: Command dispatcher for the Chitin engine client.
// Purpose: Expose every engine operation for scripting and smoke testing.
// Dependencies: chitin-client, clap, serde_json, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `chitin` binary opens one engine session per invocation, performs the
//! requested operation, and prints the result as JSON on stdout. Transport
//! selection follows the library's rules: native first, RPC sidecar fallback.
//! Policy verdicts from `propose` print as data and exit zero; exceptional
//! failures print to stderr and exit non-zero.
//!
//! Security posture: command-line inputs are forwarded to the engine
//! unvalidated by design; the engine is the validation authority.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chitin_client::Engine;
use chitin_client::EngineConfig;
use chitin_client::EngineError;
use chitin_client::EventId;
use chitin_client::Metadata;
use chitin_client::RiskTier;
use chitin_client::ToolRegistration;
use chitin_client::TrustLevel;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Errors
// ============================================================================

/// CLI-level error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// User-facing error message.
    message: String,
}

impl CliError {
    /// Creates a CLI error from a message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(error: EngineError) -> Self {
        Self::new(format!("[{}] {error}", error.status()))
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Argument Types
// ============================================================================

/// Trust level argument accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TrustLevelArg {
    /// Content originating from the system itself.
    System,
    /// Content authored by the deployment operator.
    Operator,
    /// Content authored by an end user.
    User,
    /// Content fetched from an external source.
    External,
    /// Content of unknown provenance.
    Unknown,
}

impl From<TrustLevelArg> for TrustLevel {
    fn from(arg: TrustLevelArg) -> Self {
        match arg {
            TrustLevelArg::System => Self::System,
            TrustLevelArg::Operator => Self::Operator,
            TrustLevelArg::User => Self::User,
            TrustLevelArg::External => Self::External,
            TrustLevelArg::Unknown => Self::Unknown,
        }
    }
}

/// Risk tier argument accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RiskTierArg {
    /// Low-risk tool.
    Low,
    /// Medium-risk tool.
    Medium,
    /// High-risk tool.
    High,
}

impl From<RiskTierArg> for RiskTier {
    fn from(arg: RiskTierArg) -> Self {
        match arg {
            RiskTierArg::Low => Self::Low,
            RiskTierArg::Medium => Self::Medium,
            RiskTierArg::High => Self::High,
        }
    }
}

// ============================================================================
// SECTION: Command Definitions
// ============================================================================

/// Chitin engine command-line client.
#[derive(Debug, Parser)]
#[command(name = "chitin", version, about = "Client for the Chitin security engine")]
struct Cli {
    /// Connection options shared by every subcommand.
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Requested engine operation.
    #[command(subcommand)]
    command: Command,
}

/// Connection options mapped onto [`EngineConfig`].
#[derive(Debug, Args)]
struct ConnectionArgs {
    /// Engine policy configuration path (omit for the embedded default).
    #[arg(long, global = true)]
    config_path: Option<PathBuf>,
    /// Explicit native library path (overrides CHITIN_LIB_PATH).
    #[arg(long, global = true)]
    lib_path: Option<PathBuf>,
    /// RPC sidecar base URL (overrides CHITIN_SIDECAR_URL).
    #[arg(long, global = true)]
    sidecar_url: Option<String>,
    /// RPC request timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

/// Engine operations exposed by the CLI.
#[derive(Debug, Subcommand)]
enum Command {
    /// Record a content item and print its event id.
    Ingest {
        /// Content text to record.
        content: String,
        /// Trust level for the content.
        #[arg(long, value_enum, default_value = "unknown")]
        trust: TrustLevelArg,
        /// Structured metadata as a JSON object.
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Propose a tool call and print the policy verdict.
    Propose {
        /// Tool name to propose.
        tool: String,
        /// Opaque parameter text (typically JSON).
        #[arg(default_value = "{}")]
        params: String,
        /// Proposing agent identifier.
        #[arg(long)]
        agent_id: Option<String>,
        /// Input event ids the call derives from (repeatable).
        #[arg(long = "input-source")]
        input_sources: Vec<u64>,
    },
    /// Record a tool result and print the new event id.
    RecordResult {
        /// Event id of the proposed tool call.
        tool_call_id: u64,
        /// Tool output text.
        output: String,
        /// Tool exit code.
        #[arg(long, default_value_t = 0)]
        exit_code: i32,
    },
    /// Check whether an event traces back to a label.
    IsTraced {
        /// Event id to check.
        event_id: u64,
        /// Label name.
        label: String,
    },
    /// Attach a trace label to an event.
    SetLabel {
        /// Event id to label.
        event_id: u64,
        /// Label name.
        label: String,
    },
    /// Print the trace explanation for an event.
    Explain {
        /// Event id to explain.
        event_id: u64,
    },
    /// Register a tool's risk tier and optional category.
    RegisterTool {
        /// Tool name to register.
        name: String,
        /// Declared risk tier.
        #[arg(long, value_enum, default_value = "medium")]
        risk: RiskTierArg,
        /// Tool category.
        #[arg(long)]
        category: Option<String>,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Parses arguments, installs the log subscriber, and runs one operation.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(Some(output)) => match write_json_line(&output) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => report_failure(&error),
        },
        Ok(None) => ExitCode::SUCCESS,
        Err(error) => report_failure(&error),
    }
}

/// Opens a session, dispatches the requested operation, and closes.
fn run(cli: &Cli) -> CliResult<Option<Value>> {
    let engine = Engine::open_with(engine_config(&cli.connection))?;
    let output = dispatch(&engine, &cli.command);
    engine.close();
    output
}

/// Executes one engine operation against an open session.
fn dispatch(engine: &Engine, command: &Command) -> CliResult<Option<Value>> {
    match command {
        Command::Ingest {
            content,
            trust,
            metadata,
        } => {
            let metadata = metadata.as_deref().map(parse_metadata).transpose()?;
            let event_id = engine.ingest(content, (*trust).into(), metadata.as_ref())?;
            Ok(Some(json!({ "event_id": event_id })))
        }
        Command::Propose {
            tool,
            params,
            agent_id,
            input_sources,
        } => {
            let sources: Vec<EventId> = input_sources.iter().copied().map(EventId::new).collect();
            let source_arg = if sources.is_empty() { None } else { Some(sources.as_slice()) };
            let decision = engine.propose(tool, params, agent_id.as_deref(), source_arg)?;
            let value = serde_json::to_value(&decision)
                .map_err(|err| CliError::new(format!("failed to render decision: {err}")))?;
            Ok(Some(value))
        }
        Command::RecordResult {
            tool_call_id,
            output,
            exit_code,
        } => {
            let event_id =
                engine.record_result(EventId::new(*tool_call_id), output, *exit_code)?;
            Ok(Some(json!({ "event_id": event_id })))
        }
        Command::IsTraced {
            event_id,
            label,
        } => {
            let traced = engine.is_traced(EventId::new(*event_id), label)?;
            Ok(Some(json!({ "traced": traced })))
        }
        Command::SetLabel {
            event_id,
            label,
        } => {
            engine.set_label(EventId::new(*event_id), label)?;
            Ok(None)
        }
        Command::Explain {
            event_id,
        } => {
            let explanation = engine.explain(EventId::new(*event_id))?;
            let value = serde_json::to_value(&explanation)
                .map_err(|err| CliError::new(format!("failed to render explanation: {err}")))?;
            Ok(Some(value))
        }
        Command::RegisterTool {
            name,
            risk,
            category,
        } => {
            let mut registration = ToolRegistration::new(name.clone(), (*risk).into());
            if let Some(category) = category {
                registration = registration.with_category(category.clone());
            }
            engine.register_tool(&registration)?;
            Ok(None)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the engine configuration from the environment plus CLI overrides.
fn engine_config(args: &ConnectionArgs) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(path) = &args.config_path {
        config.config_path = Some(path.clone());
    }
    if let Some(path) = &args.lib_path {
        config.library_path = Some(path.clone());
    }
    if let Some(url) = &args.sidecar_url {
        config.sidecar_url = Some(url.clone());
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.rpc_timeout = Duration::from_millis(timeout_ms);
    }
    config
}

/// Parses a metadata argument as a JSON object.
fn parse_metadata(raw: &str) -> CliResult<Metadata> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::new("metadata must be a json object")),
        Err(err) => Err(CliError::new(format!("invalid metadata json: {err}"))),
    }
}

/// Writes a JSON value to stdout with a trailing newline.
fn write_json_line(value: &Value) -> CliResult<()> {
    let mut rendered = value.to_string();
    rendered.push('\n');
    let mut stdout = std::io::stdout();
    stdout
        .write_all(rendered.as_bytes())
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))
}

/// Writes a failure to stderr and returns the failure exit code.
fn report_failure(error: &CliError) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {error}");
    ExitCode::FAILURE
}
