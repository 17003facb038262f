use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every public operation either returns a well-typed value or one of these.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid app '{0}': not installed in this deployment")]
    InvalidApp(String),

    #[error("invalid session '{0}': no session config with that name")]
    InvalidSession(String),

    #[error("not logged in at {url}")]
    NotLoggedIn { url: String },

    #[error("{operation} is not supported by the {backend} backend")]
    NotSupported {
        operation: &'static str,
        backend: &'static str,
    },

    /// A failure raised inside a worker process, relayed with its original
    /// classification and message intact.
    #[error("worker failure ({kind}): {message}")]
    Bridge { kind: String, message: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("no such key '{0}' in store")]
    UnknownKey(String),

    #[error("csv parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Rebuilds a worker-side failure from its serialized `{kind, message}`
    /// envelope. Known kinds keep their taxonomy variant; everything else
    /// stays a `Bridge` failure with the kind string preserved.
    pub fn from_worker(kind: &str, message: &str) -> Self {
        match kind {
            "invalid_app" => Error::InvalidApp(message.to_string()),
            "invalid_session" => Error::InvalidSession(message.to_string()),
            _ => Error::Bridge {
                kind: kind.to_string(),
                message: message.to_string(),
            },
        }
    }

    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Error::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
