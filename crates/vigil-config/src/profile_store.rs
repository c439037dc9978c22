//! Remote profile store configuration.

use serde::{Deserialize, Serialize};

fn default_table() -> String {
    "profiles".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProfileStoreConfig {
    /// Base URL of the REST endpoint (e.g., `https://abc.supabase.co`).
    #[serde(default)]
    pub url: String,

    /// Anonymous/service API key sent as `apikey`.
    #[serde(default)]
    pub api_key: String,

    /// Table holding one profile row per identity.
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            table: default_table(),
        }
    }
}

impl ProfileStoreConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = ProfileStoreConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.table, "profiles");
    }

    #[test]
    fn configured_when_url_and_key_set() {
        let config = ProfileStoreConfig {
            url: "https://abc.supabase.co".into(),
            api_key: "anon-key".into(),
            ..Default::default()
        };
        assert!(config.is_configured());
    }
}
