use std::fmt;
use std::sync::OnceLock;

use reqwest::blocking::Client;
use reqwest::header::REFERER;
use reqwest::Url;
use tracing::{debug, warn};

use otdata_core::{CsvStore, DataTable, Error, Result, SessionConfig};

use crate::scrape;
use crate::Middleware;

const LOGIN_PATH: &str = "accounts/login/";
const CSRF_COOKIE: &str = "csrftoken";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Backend for an already-running deployment, spoken to over HTTP.
///
/// One persistent session (cookie jar included) per instance. Login and the
/// logged-in check run once at construction; app and session discovery are
/// scraped lazily from the server's pages and cached for the instance's
/// lifetime. Everything else maps to one fixed export endpoint per call.
#[derive(Debug)]
pub struct RemoteMiddleware {
    base: Url,
    http: Client,
    apps: OnceLock<Option<Vec<String>>>,
    sessions: OnceLock<Vec<String>>,
}

impl RemoteMiddleware {
    pub fn open(base_url: &str, credentials: Option<&Credentials>) -> Result<Self> {
        let mut base =
            Url::parse(base_url).map_err(|e| Error::transport(base_url, e))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| Error::transport(base_url, e))?;
        let middleware = Self {
            base,
            http,
            apps: OnceLock::new(),
            sessions: OnceLock::new(),
        };
        if let Some(credentials) = credentials {
            middleware.login(credentials)?;
        }
        middleware.check_logged_in()?;
        Ok(middleware)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::transport(path, e))
    }

    /// Two-step CSRF login: GET the form for the token cookie, then POST the
    /// credentials with the token.
    fn login(&self, credentials: &Credentials) -> Result<()> {
        let login_url = self.url(LOGIN_PATH)?;
        debug!(url = %login_url, "logging in");
        let resp = self
            .http
            .get(login_url.clone())
            .send()
            .map_err(|e| Error::transport(login_url.as_str(), e))?;
        let token = resp
            .cookies()
            .find(|c| c.name() == CSRF_COOKIE)
            .map(|c| c.value().to_string())
            .unwrap_or_default();
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("csrfmiddlewaretoken", token.as_str()),
        ];
        let resp = self
            .http
            .post(login_url.clone())
            .header(REFERER, login_url.as_str())
            .form(&form)
            .send()
            .map_err(|e| Error::transport(login_url.as_str(), e))?;
        if !resp.status().is_success() {
            return Err(Error::transport(
                login_url.as_str(),
                format!("status {}", resp.status()),
            ));
        }
        Ok(())
    }

    /// A deployment that bounces the export landing page back to the login
    /// form did not accept our session. Checked once at construction.
    fn check_logged_in(&self) -> Result<()> {
        let url = self.url("export")?;
        let resp = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| Error::transport(url.as_str(), e))?;
        if resp.url().path().contains("accounts/login") {
            return Err(Error::NotLoggedIn {
                url: url.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(Error::transport(
                url.as_str(),
                format!("status {}", resp.status()),
            ));
        }
        Ok(())
    }

    fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path)?;
        let resp = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| Error::transport(url.as_str(), e))?;
        if !resp.status().is_success() {
            return Err(Error::transport(
                url.as_str(),
                format!("status {}", resp.status()),
            ));
        }
        resp.text().map_err(|e| Error::transport(url.as_str(), e))
    }

    fn get_table(&self, path: &str) -> Result<DataTable> {
        let body = self.get_text(path)?;
        DataTable::parse_csv(body.as_bytes())
    }

    fn discovered_apps(&self) -> Result<Option<Vec<String>>> {
        if let Some(cached) = self.apps.get() {
            return Ok(cached.clone());
        }
        let html = self.get_text("export")?;
        let found = scrape::app_names(&html);
        let apps = if found.is_empty() {
            warn!(url = %self.base, "no apps discovered on the export page");
            None
        } else {
            Some(found)
        };
        let _ = self.apps.set(apps.clone());
        Ok(apps)
    }

    /// Validates only when discovery produced a list; a deployment with no
    /// discoverable apps cannot reject names client-side.
    fn require_app(&self, app: &str) -> Result<()> {
        if let Some(apps) = self.discovered_apps()? {
            if !apps.iter().any(|a| a == app) {
                return Err(Error::InvalidApp(app.to_string()));
            }
        }
        Ok(())
    }
}

impl Middleware for RemoteMiddleware {
    fn apps(&self) -> Result<Option<Vec<String>>> {
        self.discovered_apps()
    }

    fn session_names(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.sessions.get() {
            return Ok(cached.clone());
        }
        let html = self.get_text("create_session")?;
        let names = scrape::session_names(&html);
        let _ = self.sessions.set(names.clone());
        Ok(names)
    }

    fn session_config(&self, _name: &str) -> Result<SessionConfig> {
        // defaults are only readable from inside the application's process
        Err(Error::NotSupported {
            operation: "session_config",
            backend: "remote",
        })
    }

    fn all_data(&self) -> Result<DataTable> {
        self.get_table("ExportWide")
    }

    fn time_spent(&self) -> Result<DataTable> {
        self.get_table("ExportTimeSpent")
    }

    fn app_data(&self, app: &str) -> Result<DataTable> {
        self.require_app(app)?;
        self.get_table(&format!("ExportApp/{app}"))
    }

    fn app_doc(&self, app: &str) -> Result<String> {
        self.require_app(app)?;
        self.get_text(&format!("ExportAppDocs/{app}"))
    }

    fn bot_data(&self, _session: &str, _participants: Option<u64>) -> Result<CsvStore> {
        Err(Error::NotSupported {
            operation: "bot_data",
            backend: "remote",
        })
    }
}

impl fmt::Display for RemoteMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<oTree@{}>", self.base)
    }
}
