use crate::client::KsqlClient;
use crate::decode::row_to_frame;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use ksql_core::{DataFrame, Error, HealthResponse, PluginSettings, Query, Result, StreamHandler};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{error, info, warn};

/// Runs ksqlDB push queries behind live channels
#[derive(Debug, Clone, Default)]
pub struct KsqlStreamHandler;

impl KsqlStreamHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamHandler for KsqlStreamHandler {
    async fn run_stream(
        &self,
        settings: &PluginSettings,
        path: &str,
        query: Query,
    ) -> Result<BoxStream<'static, Result<DataFrame>>> {
        let client = KsqlClient::new(settings)?;
        let timeout = Duration::from_secs(query.effective_timeout());
        let deadline = Instant::now() + timeout;

        info!(
            "[{}] Running push query with a {}s timeout",
            path,
            timeout.as_secs()
        );

        // The deadline covers the request and the header as well as the rows.
        let push = match timeout_at(deadline, client.push(&query.query_text)).await {
            Ok(push) => push?,
            Err(_) => {
                warn!("[{}] No query header within {}s", path, timeout.as_secs());
                return Err(Error::Connection(format!(
                    "Push query timed out after {}s waiting for ksqlDB",
                    timeout.as_secs()
                )));
            }
        };
        let header = Arc::new(push.header);
        let channel = path.to_string();

        let frames = push
            .rows
            .filter_map(move |row| {
                let header = header.clone();
                let channel = channel.clone();
                async move {
                    match row {
                        Ok(row) => match row_to_frame(&header, &row) {
                            Ok(frame) => Some(Ok(frame)),
                            Err(e) => {
                                warn!("[{}] Skipping row: {}", channel, e);
                                None
                            }
                        },
                        Err(Error::Connection(message)) => {
                            error!("[{}] ksqlDB reported: {}", channel, message);
                            Some(Err(Error::Connection(message)))
                        }
                        Err(e) => {
                            warn!("[{}] Skipping undecodable line: {}", channel, e);
                            None
                        }
                    }
                }
            })
            .take_until(sleep_until(deadline));

        // The first error ends the channel, after it has been delivered.
        let frames = frames
            .scan(false, |failed, item| {
                let next = if *failed {
                    None
                } else {
                    *failed = item.is_err();
                    Some(item)
                };
                futures::future::ready(next)
            })
            .boxed();

        Ok(frames)
    }
}

/// Answer the backend `/health` resource for one instance
pub async fn check_health(settings: Result<PluginSettings>) -> HealthResponse {
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Unable to load settings: {}", e);
            return HealthResponse::error("Unable to load settings");
        }
    };

    if settings.ksqlserver.is_empty() {
        return HealthResponse::error("KsqlDB server is a mandatory parameter");
    }

    let client = match KsqlClient::new(&settings) {
        Ok(client) => client,
        Err(e) => return HealthResponse::error(e.to_string()),
    };

    match client.health().await {
        Ok(health) if health.is_healthy => HealthResponse::ok("Data source is working"),
        Ok(health) => HealthResponse::error(format!("KsqlDB reports unhealthy: {}", health.details)),
        Err(e) => HealthResponse::error(e.to_string()),
    }
}
