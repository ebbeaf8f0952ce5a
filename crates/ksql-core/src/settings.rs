use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Key of the password inside the decrypted secure settings map
pub const PASSWORD_KEY: &str = "password";

/// Connection settings persisted for one data source instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceJsonData {
    /// Base URL of the ksqlDB server
    #[serde(default)]
    pub ksqlserver: String,

    /// Use plaintext HTTP instead of HTTPS
    #[serde(default)]
    pub http: bool,

    /// Optional username for basic authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Sensitive settings, only ever sent towards the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureJsonData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Which secure settings have a stored value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureJsonFields {
    #[serde(default)]
    pub password: bool,
}

/// Raw settings handed over by the host for one instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSettings {
    /// Data source instance identifier, used as channel namespace
    pub uid: String,

    /// Unparsed `jsonData`
    #[serde(default)]
    pub json_data: Value,

    #[serde(default)]
    pub decrypted_secure_json_data: HashMap<String, String>,
}

/// Settings as seen by the backend after decryption
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSettings {
    pub ksqlserver: String,
    pub http: bool,
    pub username: String,
    pub password: String,
}

impl PluginSettings {
    pub fn load(source: &InstanceSettings) -> Result<Self> {
        let json_data = if source.json_data.is_null() {
            DataSourceJsonData::default()
        } else {
            serde_json::from_value::<DataSourceJsonData>(source.json_data.clone()).map_err(
                |e| Error::Configuration(format!("could not unmarshal PluginSettings json: {}", e)),
            )?
        };

        Ok(Self {
            ksqlserver: json_data.ksqlserver,
            http: json_data.http,
            username: json_data.username.unwrap_or_default(),
            password: source
                .decrypted_secure_json_data
                .get(PASSWORD_KEY)
                .cloned()
                .unwrap_or_default(),
        })
    }

    /// Credentials for basic auth, present only when a username is set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_plugin_settings() {
        let mut secure = HashMap::new();
        secure.insert(PASSWORD_KEY.to_string(), "s3cret".to_string());

        let source = InstanceSettings {
            uid: "ds-1".to_string(),
            json_data: json!({"ksqlserver": "http://localhost:8088", "http": true, "username": "bob"}),
            decrypted_secure_json_data: secure,
        };

        let settings = PluginSettings::load(&source).unwrap();
        assert_eq!(settings.ksqlserver, "http://localhost:8088");
        assert!(settings.http);
        assert_eq!(settings.credentials(), Some(("bob", "s3cret")));
    }

    #[test]
    fn test_load_defaults_for_missing_fields() {
        let source = InstanceSettings {
            uid: "ds-2".to_string(),
            ..Default::default()
        };

        let settings = PluginSettings::load(&source).unwrap();
        assert!(settings.ksqlserver.is_empty());
        assert!(!settings.http);
        assert_eq!(settings.credentials(), None);
    }

    #[test]
    fn test_load_rejects_malformed_json_data() {
        let source = InstanceSettings {
            uid: "ds-3".to_string(),
            json_data: json!({"ksqlserver": 42}),
            decrypted_secure_json_data: HashMap::new(),
        };

        let err = PluginSettings::load(&source).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
