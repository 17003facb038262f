use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of operations a worker can run against a deployment.
///
/// Serialized as JSON to the worker's stdin; arbitrary closures cannot cross
/// a process boundary, and the failure taxonomy is closed for the same
/// reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Query {
    /// Fetch the hosted application's live configuration object.
    Settings,
    /// Full wide-format export, one row per participant.
    AllData,
    /// Page-timing export.
    TimeSpent,
    /// Per-app data export.
    AppData { app: String },
    /// Per-app documentation export.
    AppDoc { app: String },
    /// Run the bot harness for one session and collect per-app buffers.
    BotData { session: String, participants: u64 },
}

/// Explicit per-call worker configuration, replacing the ambient patches the
/// hosted runtime would otherwise need (stdout muting, message-bus toggles).
/// Scoped to exactly one worker invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOptions {
    /// Mute the hosted application's own console output and warnings so the
    /// caller's streams stay clean.
    pub suppress_output: bool,
    /// Run without any external message-bus dependency.
    pub disable_bus: bool,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            suppress_output: true,
            disable_bus: false,
        }
    }
}

impl WorkerOptions {
    /// Options for a bot run: muted output and no external bus.
    pub fn bot() -> Self {
        Self {
            suppress_output: true,
            disable_bus: true,
        }
    }
}

/// What the worker reads from stdin: one query plus its per-call options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEnvelope {
    pub query: Query,
    pub options: WorkerOptions,
}

/// What the worker writes back: its final stdout line is exactly one of
/// these. Arbitrary native exceptions are never serialized; failures are
/// reduced to a `{kind, message}` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResultEnvelope {
    Ok { value: Value },
    Error { kind: String, message: String },
}
