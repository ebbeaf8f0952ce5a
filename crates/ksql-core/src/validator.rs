use crate::resource::{ResourceClient, HEALTH_OK, HEALTH_RESOURCE};
use crate::settings::DataSourceJsonData;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const MISSING_URL_MESSAGE: &str = "KSQLDB URL is a mandatory field. Please provide a valid URL.";
pub const INVALID_SCHEME_MESSAGE: &str = "KSQLDB URL must start with http:// or https://";
pub const CONNECTED_MESSAGE: &str = "Successfully connected to KSQLDB via backend plugin.";
pub const FALLBACK_FAILURE_MESSAGE: &str = "Failed to connect to KSQLDB. Please check the URL.";

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Error,
}

/// Verdict of a connection test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub message: String,
}

impl ValidationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ValidationStatus::Success
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorOptions {
    /// Put the configured username into transport fault diagnostics
    pub include_credentials: bool,
}

/// Check that the configured server can be reached through the backend.
///
/// Runs presence, scheme and backend health checks in order and stops at
/// the first failure. Never returns an error: every outcome is folded into
/// the [`ValidationResult`].
pub async fn validate_connectivity(
    settings: &DataSourceJsonData,
    client: &dyn ResourceClient,
    options: ValidatorOptions,
) -> ValidationResult {
    let url = settings.ksqlserver.as_str();

    if url.is_empty() {
        return ValidationResult::error(MISSING_URL_MESSAGE);
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return ValidationResult::error(INVALID_SCHEME_MESSAGE);
    }

    debug!("Checking backend health for {}", url);

    let response = match client.get_resource(HEALTH_RESOURCE).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Health check against backend failed: {}", e);
            let username = describe_username(settings.username.as_deref(), options);
            return ValidationResult::error(format!(
                "Failed to connect to KSQLDB at {} (http: {}, username: {}): {}",
                url, settings.http, username, e
            ));
        }
    };

    if response.get("status").and_then(|s| s.as_str()) == Some(HEALTH_OK) {
        return ValidationResult::success(CONNECTED_MESSAGE);
    }

    let message = response
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_FAILURE_MESSAGE);

    ValidationResult::error(message)
}

fn describe_username(username: Option<&str>, options: ValidatorOptions) -> &str {
    match username.filter(|u| !u.is_empty()) {
        None => "<none>",
        Some(name) if options.include_credentials => name,
        Some(_) => REDACTED,
    }
}
