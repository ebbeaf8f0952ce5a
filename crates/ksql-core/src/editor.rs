use crate::settings::{DataSourceJsonData, SecureJsonData, SecureJsonFields};
use serde::{Deserialize, Serialize};

/// Options object edited by the configuration form.
///
/// Every edit produces a new value; the previous one is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceOptions {
    pub json_data: DataSourceJsonData,

    /// Stored secrets, exposed only as flags
    #[serde(default)]
    pub secure_json_fields: SecureJsonFields,

    /// Plaintext secrets pending a save
    #[serde(default)]
    pub secure_json_data: SecureJsonData,
}

/// A single change made in the configuration form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsUpdate {
    SetServer(String),
    SetHttp(bool),
    SetUsername(String),
    SetPassword(String),
    ResetPassword,
}

impl DataSourceOptions {
    pub fn new(json_data: DataSourceJsonData) -> Self {
        Self {
            json_data,
            ..Default::default()
        }
    }

    /// Return the options with `update` merged in
    pub fn apply(&self, update: OptionsUpdate) -> Self {
        let mut next = self.clone();
        match update {
            OptionsUpdate::SetServer(url) => next.json_data.ksqlserver = url,
            OptionsUpdate::SetHttp(http) => next.json_data.http = http,
            OptionsUpdate::SetUsername(username) => next.json_data.username = Some(username),
            OptionsUpdate::SetPassword(password) => {
                next.secure_json_data = SecureJsonData {
                    password: Some(password),
                };
            }
            OptionsUpdate::ResetPassword => {
                next.secure_json_fields.password = false;
                next.secure_json_data.password = Some(String::new());
            }
        }
        next
    }

    /// Whether a password is stored
    pub fn is_password_configured(&self) -> bool {
        self.secure_json_fields.password
    }

    /// Hand pending secrets upstream.
    ///
    /// Returns the payload to persist and the options with the plaintext
    /// cleared. An empty pending password clears the stored one.
    pub fn commit(&self) -> (SecureJsonData, Self) {
        let payload = self.secure_json_data.clone();
        let mut next = self.clone();
        next.secure_json_data = SecureJsonData::default();

        if let Some(password) = &payload.password {
            next.secure_json_fields.password = !password.is_empty();
        }

        (payload, next)
    }
}
