use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the backend health resource
pub const HEALTH_RESOURCE: &str = "/health";

/// Status value the backend reports when healthy
pub const HEALTH_OK: &str = "ok";

/// RPC-style calls from the data source to its backend process
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Issue `GET <path>` against the backend and return the decoded body
    async fn get_resource(&self, path: &str) -> Result<Value>;
}

/// Body of the backend `/health` resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HEALTH_OK.to_string(),
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HEALTH_OK
    }
}
