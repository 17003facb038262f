//! One read-only query surface over two physically different oTree backends:
//! a local deployment directory queried through worker processes, and a
//! running server queried over HTTP. [`Deployment`] picks the backend once
//! at construction and forwards every operation.

mod deployment;
mod local;
mod remote;
mod scrape;

pub use deployment::{Deployment, Mode};
pub use local::LocalMiddleware;
pub use remote::{Credentials, RemoteMiddleware};

use otdata_core::{CsvStore, DataTable, Result, SessionConfig};

/// The operation set both backends implement.
///
/// `apps` returns `None` when a deployment has no discoverable apps yet, a
/// soft signal distinct from a hard failure. Operations that only make sense
/// with process-level access (`session_config` defaults, `bot_data`) fail
/// with `NotSupported` on the remote backend.
pub trait Middleware {
    /// Installed app names, in deployment order.
    fn apps(&self) -> Result<Option<Vec<String>>>;
    /// Session configuration names, in declaration order.
    fn session_names(&self) -> Result<Vec<String>>;
    /// The named session config merged over the deployment defaults.
    fn session_config(&self, name: &str) -> Result<SessionConfig>;
    /// Full wide-format export.
    fn all_data(&self) -> Result<DataTable>;
    /// Page-timing export.
    fn time_spent(&self) -> Result<DataTable>;
    /// Per-app data export.
    fn app_data(&self, app: &str) -> Result<DataTable>;
    /// Per-app documentation export.
    fn app_doc(&self, app: &str) -> Result<String>;
    /// One bot run of the named session; participant count defaults to the
    /// session config's demo count.
    fn bot_data(&self, session: &str, participants: Option<u64>) -> Result<CsvStore>;
}
