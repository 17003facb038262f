use std::io::Read;
use std::sync::mpsc;
use std::thread;

use otdata_core::{Error, Result};

use crate::query::ResultEnvelope;

/// One-shot, single-producer/single-consumer channel moving a serialized
/// worker outcome back to the caller.
///
/// A reader thread drains the worker's output stream to completion (so the
/// worker never blocks on a full pipe), decodes the final non-empty line as
/// the result envelope, and sends it; `recv` blocks the caller until that
/// single value arrives.
pub struct ResultChannel {
    rx: mpsc::Receiver<Result<ResultEnvelope>>,
}

impl ResultChannel {
    pub fn attach<R: Read + Send + 'static>(source: R) -> Self {
        let (tx, rx) = mpsc::sync_channel(1);
        thread::spawn(move || {
            let _ = tx.send(decode(source));
        });
        Self { rx }
    }

    /// Blocks until the worker's outcome is available. Consumes the channel;
    /// a worker produces exactly one result.
    pub fn recv(self) -> Result<ResultEnvelope> {
        self.rx.recv().map_err(|_| Error::Bridge {
            kind: "channel_closed".to_string(),
            message: "worker ended without producing a result".to_string(),
        })?
    }
}

fn decode<R: Read>(mut source: R) -> Result<ResultEnvelope> {
    let mut text = String::new();
    source.read_to_string(&mut text)?;
    let line = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::Bridge {
            kind: "protocol_error".to_string(),
            message: "worker produced no output".to_string(),
        })?;
    serde_json::from_str(line.trim()).map_err(|_| Error::Bridge {
        kind: "protocol_error".to_string(),
        message: format!("unparseable worker result: {}", truncate(line.trim())),
    })
}

fn truncate(s: &str) -> String {
    const MAX: usize = 200;
    if s.len() <= MAX {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..cut])
    }
}
