use std::fmt;

use reqwest::Url;

use otdata_core::{CsvStore, DataTable, Result, SessionConfig};

use crate::local::LocalMiddleware;
use crate::remote::{Credentials, RemoteMiddleware};
use crate::Middleware;

/// Backend selection. `Auto` classifies the location string once: an
/// absolute URL with scheme and host is remote, anything else is a local
/// directory path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Auto,
    Local,
    Remote,
}

/// One deployment, local or remote, behind a single operation set.
///
/// The variant is chosen at construction and never re-evaluated; every call
/// is pure delegation.
pub enum Deployment {
    Local(LocalMiddleware),
    Remote(RemoteMiddleware),
}

impl Deployment {
    pub fn open(location: &str, mode: Mode, credentials: Option<&Credentials>) -> Result<Self> {
        let remote = match mode {
            Mode::Auto => is_remote_location(location),
            Mode::Local => false,
            Mode::Remote => true,
        };
        if remote {
            RemoteMiddleware::open(location, credentials).map(Self::Remote)
        } else {
            LocalMiddleware::open(location).map(Self::Local)
        }
    }

    pub fn location(&self) -> String {
        match self {
            Self::Local(local) => local.path().display().to_string(),
            Self::Remote(remote) => remote.base_url().to_string(),
        }
    }

    fn inner(&self) -> &dyn Middleware {
        match self {
            Self::Local(local) => local,
            Self::Remote(remote) => remote,
        }
    }
}

pub(crate) fn is_remote_location(location: &str) -> bool {
    match Url::parse(location) {
        Ok(url) => url.has_host() && matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

impl Middleware for Deployment {
    fn apps(&self) -> Result<Option<Vec<String>>> {
        self.inner().apps()
    }

    fn session_names(&self) -> Result<Vec<String>> {
        self.inner().session_names()
    }

    fn session_config(&self, name: &str) -> Result<SessionConfig> {
        self.inner().session_config(name)
    }

    fn all_data(&self) -> Result<DataTable> {
        self.inner().all_data()
    }

    fn time_spent(&self) -> Result<DataTable> {
        self.inner().time_spent()
    }

    fn app_data(&self, app: &str) -> Result<DataTable> {
        self.inner().app_data(app)
    }

    fn app_doc(&self, app: &str) -> Result<String> {
        self.inner().app_doc(app)
    }

    fn bot_data(&self, session: &str, participants: Option<u64>) -> Result<CsvStore> {
        self.inner().bot_data(session, participants)
    }
}

impl From<LocalMiddleware> for Deployment {
    fn from(local: LocalMiddleware) -> Self {
        Self::Local(local)
    }
}

impl From<RemoteMiddleware> for Deployment {
    fn from(remote: RemoteMiddleware) -> Self {
        Self::Remote(remote)
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(local) => local.fmt(f),
            Self::Remote(remote) => remote.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_with_scheme_and_host_are_remote() {
        assert!(is_remote_location("http://localhost:8000"));
        assert!(is_remote_location("https://otree.example.org/demo"));
    }

    #[test]
    fn paths_are_local() {
        assert!(!is_remote_location("/srv/deployments/oTree"));
        assert!(!is_remote_location("./experiment"));
        assert!(!is_remote_location("experiment"));
    }

    #[test]
    fn other_schemes_are_not_remote() {
        // `file:/x` and friends parse as URLs but have no HTTP host
        assert!(!is_remote_location("file:///srv/oTree"));
        assert!(!is_remote_location("c:/deployments/oTree"));
    }
}
