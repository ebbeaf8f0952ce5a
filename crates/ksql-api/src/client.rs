use async_trait::async_trait;
use ksql_core::{Error, ResourceClient, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Resource client calling the backend API over HTTP
#[derive(Clone)]
pub struct HttpResourceClient {
    base_url: String,
    http: Client,
}

impl HttpResourceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get_resource(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Request to {} failed: {}", url, e)))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Connection(format!("Invalid response from {}: {}", url, e)))
    }
}
