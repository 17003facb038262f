use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use otdata_core::{Error, Result};

use crate::channel::ResultChannel;
use crate::query::{Query, QueryEnvelope, ResultEnvelope, WorkerOptions};

const DRIVER_SOURCE: &str = include_str!("../assets/driver.py");

/// How a worker process is launched.
///
/// The default runs the deployment's Python interpreter on the embedded
/// driver program. `raw` skips the driver entirely, which lets tests
/// substitute a stub that speaks the same stdin/stdout protocol.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: String,
    args: Vec<String>,
    needs_driver: bool,
}

impl WorkerCommand {
    /// The deployment's default interpreter plus the embedded driver.
    pub fn python() -> Self {
        Self::interpreter("python3")
    }

    /// A specific interpreter (e.g. a virtualenv python) plus the driver.
    pub fn interpreter(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            needs_driver: true,
        }
    }

    /// An arbitrary command speaking the worker protocol itself.
    pub fn raw(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            needs_driver: false,
        }
    }
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self::python()
    }
}

/// Runs queries inside a deployment's own runtime, one freshly spawned
/// worker per call.
///
/// The worker is pinned to the deployment directory, boots the hosted
/// application once, runs the query, and reports a single result envelope.
/// Spawn, run once, join, discard: the bootstrap step is not reentrant, so
/// workers are never pooled or reused.
pub struct ExecutionBridge {
    workdir: PathBuf,
    command: WorkerCommand,
}

impl ExecutionBridge {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self::with_command(workdir, WorkerCommand::default())
    }

    pub fn with_command(workdir: impl Into<PathBuf>, command: WorkerCommand) -> Self {
        Self {
            workdir: workdir.into(),
            command,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Blocking round trip: spawn a worker, feed it the query, wait for its
    /// outcome. A failure raised inside the worker comes back with its kind
    /// and message intact, never downgraded to a generic error.
    pub fn execute<T: DeserializeOwned>(&self, query: Query, options: WorkerOptions) -> Result<T> {
        let payload = serde_json::to_vec(&QueryEnvelope { query, options })?;
        debug!(workdir = %self.workdir.display(), "spawning query worker");

        // lives until the worker is joined, removed on drop
        let driver = if self.command.needs_driver {
            Some(materialize_driver()?)
        } else {
            None
        };

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        if let Some(driver) = &driver {
            cmd.arg(driver.path());
        }
        cmd.current_dir(&self.workdir);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        // A worker that fails before reading stdin closes the pipe early;
        // the envelope on stdout/stderr still tells the real story.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(&payload);
        }
        let stdout = child.stdout.take().ok_or_else(|| {
            Error::Io(std::io::Error::other("worker stdout was not captured"))
        })?;
        let channel = ResultChannel::attach(stdout);
        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            text
        });

        let status = child.wait()?;
        let stderr_text = stderr_reader.join().unwrap_or_default();

        match channel.recv() {
            Ok(ResultEnvelope::Ok { value }) => Ok(serde_json::from_value(value)?),
            Ok(ResultEnvelope::Error { kind, message }) => {
                Err(Error::from_worker(&kind, &message))
            }
            Err(protocol_err) => {
                if status.success() {
                    Err(protocol_err)
                } else {
                    Err(Error::Bridge {
                        kind: "worker_exit".to_string(),
                        message: format!(
                            "worker exited with {}: {}",
                            status,
                            last_line(&stderr_text)
                        ),
                    })
                }
            }
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no diagnostic output")
}

/// Writes the embedded driver out for one worker invocation. Exclusive
/// creation; the file disappears when the handle drops.
fn materialize_driver() -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(".otdata_driver.")
        .suffix(".py")
        .tempfile()?;
    file.write_all(DRIVER_SOURCE.as_bytes())?;
    Ok(file)
}
