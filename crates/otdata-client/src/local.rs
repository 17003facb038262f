use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use otdata_bridge::{ExecutionBridge, Query, WorkerCommand, WorkerOptions};
use otdata_core::{CsvStore, DataTable, Error, Result, SessionConfig, Settings};

use crate::Middleware;

/// Backend for a deployment directory on this machine.
///
/// Construction routes a single settings query through the execution bridge;
/// the returned [`Settings`] snapshot is immutable for the lifetime of the
/// instance. Every data operation is one further blocking bridge round trip.
pub struct LocalMiddleware {
    path: PathBuf,
    bridge: ExecutionBridge,
    settings: Settings,
}

impl LocalMiddleware {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_command(path, WorkerCommand::default())
    }

    /// Opens the deployment with a specific worker command (a virtualenv
    /// interpreter, or a protocol stub in tests).
    pub fn open_with_command(path: impl AsRef<Path>, command: WorkerCommand) -> Result<Self> {
        let path = path.as_ref().canonicalize()?;
        let bridge = ExecutionBridge::with_command(&path, command);
        debug!(path = %path.display(), "fetching deployment settings");
        let settings: Settings = bridge.execute(Query::Settings, WorkerOptions::default())?;
        Ok(Self {
            path,
            bridge,
            settings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn require_app(&self, app: &str) -> Result<()> {
        if self.settings.has_app(app) {
            Ok(())
        } else {
            Err(Error::InvalidApp(app.to_string()))
        }
    }

    fn fetch_table(&self, query: Query) -> Result<DataTable> {
        let text: String = self.bridge.execute(query, WorkerOptions::default())?;
        DataTable::parse_csv(text.as_bytes())
    }
}

/// Per-app export buffers collected by one bot run.
#[derive(Debug, Deserialize)]
struct BotBuffers {
    buffers: Vec<(String, String)>,
}

impl Middleware for LocalMiddleware {
    fn apps(&self) -> Result<Option<Vec<String>>> {
        Ok(Some(self.settings.apps.clone()))
    }

    // pure settings read, no worker round trip
    fn session_names(&self) -> Result<Vec<String>> {
        Ok(self.settings.session_names())
    }

    fn session_config(&self, name: &str) -> Result<SessionConfig> {
        self.settings.session_config(name)
    }

    fn all_data(&self) -> Result<DataTable> {
        self.fetch_table(Query::AllData)
    }

    fn time_spent(&self) -> Result<DataTable> {
        self.fetch_table(Query::TimeSpent)
    }

    fn app_data(&self, app: &str) -> Result<DataTable> {
        self.require_app(app)?;
        self.fetch_table(Query::AppData {
            app: app.to_string(),
        })
    }

    fn app_doc(&self, app: &str) -> Result<String> {
        self.require_app(app)?;
        self.bridge.execute(
            Query::AppDoc {
                app: app.to_string(),
            },
            WorkerOptions::default(),
        )
    }

    fn bot_data(&self, session: &str, participants: Option<u64>) -> Result<CsvStore> {
        let config = self.settings.session_config(session)?;
        let participants = match participants {
            Some(n) => n,
            None => config.num_demo_participants().ok_or_else(|| {
                Error::InvalidSession(format!(
                    "{session} (no num_demo_participants configured)"
                ))
            })?,
        };
        let raw: BotBuffers = self.bridge.execute(
            Query::BotData {
                session: session.to_string(),
                participants,
            },
            WorkerOptions::bot(),
        )?;

        // key order follows the session's app sequence; an app the harness
        // produced no buffer for still gets a key (empty table on read)
        let mut leftovers = raw.buffers;
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
        for app in config.app_sequence() {
            if let Some(pos) = leftovers.iter().position(|(name, _)| *name == app) {
                let (name, text) = leftovers.remove(pos);
                entries.push((name, text.into_bytes()));
            } else {
                entries.push((app, Vec::new()));
            }
        }
        for (name, text) in leftovers {
            entries.push((name, text.into_bytes()));
        }
        Ok(CsvStore::new(entries))
    }
}

impl fmt::Display for LocalMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<oTree@{}>", self.path.display())
    }
}
