use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Snapshot of a deployment's live configuration, fetched once per local
/// middleware instance by running inside the hosted application. The remote
/// backend never has one of these; session-config defaults are only readable
/// from inside the application's own process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Installed app names, in installation order.
    pub apps: Vec<String>,
    /// Raw session configs, each a mapping with a unique `name` field.
    pub session_configs: Vec<Map<String, Value>>,
    /// Defaults every session config is merged over.
    #[serde(default)]
    pub session_config_defaults: Map<String, Value>,
}

impl Settings {
    pub fn has_app(&self, name: &str) -> bool {
        self.apps.iter().any(|a| a == name)
    }

    /// Session config names in declaration order.
    pub fn session_names(&self) -> Vec<String> {
        self.session_configs
            .iter()
            .filter_map(|c| c.get("name").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .collect()
    }

    /// The named session config merged over the deployment defaults.
    pub fn session_config(&self, name: &str) -> Result<SessionConfig> {
        let config = self
            .session_configs
            .iter()
            .find(|c| c.get("name").and_then(|v| v.as_str()) == Some(name))
            .ok_or_else(|| Error::InvalidSession(name.to_string()))?;
        let mut merged = self.session_config_defaults.clone();
        for (key, value) in config {
            merged.insert(key.clone(), value.clone());
        }
        Ok(SessionConfig(merged))
    }
}

/// One merged session configuration: defaults overlaid with the named
/// config's own entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig(pub Map<String, Value>);

impl SessionConfig {
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }

    /// Default participant count for demo/bot runs.
    pub fn num_demo_participants(&self) -> Option<u64> {
        self.0.get("num_demo_participants").and_then(|v| v.as_u64())
    }

    /// Ordered sequence of app names a run of this session exercises.
    pub fn app_sequence(&self) -> Vec<String> {
        self.0
            .get("app_sequence")
            .and_then(|v| v.as_array())
            .map(|apps| {
                apps.iter()
                    .filter_map(|a| a.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}
