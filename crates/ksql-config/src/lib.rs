use ksql_core::{DataSourceJsonData, InstanceSettings, PASSWORD_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub datasource: DataSourceConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// One configured ksqlDB data source instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Instance identifier, used as live channel namespace
    pub uid: String,

    /// Base URL of the ksqlDB server
    pub ksqlserver: String,

    /// Use plaintext HTTP/2 instead of HTTPS
    #[serde(default)]
    pub http: bool,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Show the username in connection test diagnostics
    #[serde(default)]
    pub include_credentials_in_diagnostics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON formatted logs
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            datasource: DataSourceConfig::default(),
            api: ApiConfig {
                host: "localhost".to_string(),
                port: 3000,
                cors_enabled: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            uid: "ksqldb".to_string(),
            ksqlserver: "http://localhost:8088".to_string(),
            http: false,
            username: None,
            password: None,
            include_credentials_in_diagnostics: false,
        }
    }
}

impl DataSourceConfig {
    pub fn json_data(&self) -> DataSourceJsonData {
        DataSourceJsonData {
            ksqlserver: self.ksqlserver.clone(),
            http: self.http,
            username: self.username.clone().filter(|u| !u.is_empty()),
        }
    }

    /// Settings in the shape the backend receives them from the host
    pub fn instance_settings(&self) -> anyhow::Result<InstanceSettings> {
        let mut secure = HashMap::new();
        if let Some(password) = &self.password {
            secure.insert(PASSWORD_KEY.to_string(), password.clone());
        }

        Ok(InstanceSettings {
            uid: self.uid.clone(),
            json_data: serde_json::to_value(self.json_data())?,
            decrypted_secure_json_data: secure,
        })
    }
}

impl ApiConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    pub fn load(config_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_dir = config_dir.as_ref();
        let s = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::File::with_name(&config_dir.join("default.yaml").to_string_lossy())
                    .required(false),
            )
            // Container overrides
            .add_source(
                config::File::with_name(&config_dir.join("docker.yaml").to_string_lossy())
                    .required(false),
            )
            // KSQL_API__PORT=4000, KSQL_DATASOURCE__KSQLSERVER=http://host:8088
            .add_source(
                config::Environment::with_prefix("KSQL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config = s.try_deserialize()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksql_core::PluginSettings;

    #[test]
    fn test_load_without_files_uses_defaults() {
        let config = AppConfig::load("does-not-exist").unwrap();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.datasource.uid, "ksqldb");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_yaml_round_trip_and_layering() {
        let dir = std::env::temp_dir().join(format!("ksql-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = AppConfig::default();
        config.datasource.ksqlserver = "https://ksql.internal:8088".to_string();
        config.datasource.username = Some("svc".to_string());
        config.api.port = 4100;
        config.to_file(dir.join("default.yaml")).unwrap();

        let loaded = AppConfig::load(&dir).unwrap();
        assert_eq!(loaded.datasource.ksqlserver, "https://ksql.internal:8088");
        assert_eq!(loaded.datasource.username.as_deref(), Some("svc"));
        assert_eq!(loaded.api.port, 4100);

        let from_file = AppConfig::from_file(dir.join("default.yaml")).unwrap();
        assert_eq!(from_file.api.port, 4100);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_instance_settings_carry_password_separately() {
        let datasource = DataSourceConfig {
            username: Some("svc".to_string()),
            password: Some("pw".to_string()),
            ..Default::default()
        };

        let instance = datasource.instance_settings().unwrap();
        assert!(instance.json_data.get("password").is_none());

        let settings = PluginSettings::load(&instance).unwrap();
        assert_eq!(settings.credentials(), Some(("svc", "pw")));
    }
}
