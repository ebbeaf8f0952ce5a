use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use ksql_core::{
    ChannelAddress, DataFrame, DataQueryResponse, Error, InstanceSettings, LiveStreamService,
    PluginSettings, PublishStreamStatus, Result, StreamHandler, SubscribeStreamStatus,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

type ActiveChannels = Arc<Mutex<HashMap<String, usize>>>;

/// Subscriber count of one open channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub address: String,
    pub subscribers: usize,
}

/// In-process live channel service.
///
/// Runs the backend stream handler for every subscription and keeps track
/// of which channels are open. A channel closes when its stream is dropped.
#[derive(Clone)]
pub struct LiveHub {
    settings: Arc<InstanceSettings>,
    handler: Arc<dyn StreamHandler>,
    active: ActiveChannels,
}

impl LiveHub {
    pub fn new(settings: InstanceSettings, handler: Arc<dyn StreamHandler>) -> Self {
        Self {
            settings: Arc::new(settings),
            handler,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> &InstanceSettings {
        &self.settings
    }

    pub fn open(&self, addr: ChannelAddress) -> BoxStream<'static, DataQueryResponse> {
        let guard = ChannelGuard::register(self.active.clone(), addr.to_string());
        let handler = self.handler.clone();
        let settings = self.settings.clone();
        let key = addr.path.clone();

        stream::once(async move {
            let responses = match start_channel(handler, settings, addr).await {
                Ok(frames) => {
                    let key = key.clone();
                    frames
                        .map(move |frame| match frame {
                            Ok(frame) => DataQueryResponse::frame(key.clone(), frame),
                            Err(e) => DataQueryResponse::error(key.clone(), e.to_string()),
                        })
                        .boxed()
                }
                Err(e) => {
                    warn!("Channel {} failed to start: {}", key, e);
                    stream::once(future::ready(DataQueryResponse::error(key, e.to_string()))).boxed()
                }
            };

            // The guard lives as long as the stream that owns it.
            responses.map(move |response| {
                let _held = &guard;
                response
            })
        })
        .flatten()
        .boxed()
    }

    /// Ask the backend whether a client may publish into `path`
    pub async fn publish(&self, path: &str) -> PublishStreamStatus {
        self.handler.publish_stream(path).await
    }

    pub fn active_channels(&self) -> Vec<ChannelInfo> {
        let Ok(active) = self.active.lock() else {
            return Vec::new();
        };

        let mut channels: Vec<_> = active
            .iter()
            .map(|(address, subscribers)| ChannelInfo {
                address: address.clone(),
                subscribers: *subscribers,
            })
            .collect();
        channels.sort_by(|a, b| a.address.cmp(&b.address));
        channels
    }
}

impl LiveStreamService for LiveHub {
    fn get_data_stream(&self, addr: ChannelAddress) -> BoxStream<'static, DataQueryResponse> {
        self.open(addr)
    }
}

async fn start_channel(
    handler: Arc<dyn StreamHandler>,
    settings: Arc<InstanceSettings>,
    addr: ChannelAddress,
) -> Result<BoxStream<'static, Result<DataFrame>>> {
    if addr.namespace != settings.uid {
        return Err(Error::Configuration(format!(
            "Unknown data source '{}'",
            addr.namespace
        )));
    }

    match handler.subscribe_stream(&addr.path).await {
        SubscribeStreamStatus::Ok => {}
        status => {
            return Err(Error::Configuration(format!(
                "Subscription to '{}' refused: {:?}",
                addr.path, status
            )))
        }
    }

    let plugin_settings = PluginSettings::load(&settings)?;
    info!("Opening channel {}", addr);
    handler
        .run_stream(&plugin_settings, &addr.path, addr.data)
        .await
}

struct ChannelGuard {
    active: ActiveChannels,
    address: String,
}

impl ChannelGuard {
    fn register(active: ActiveChannels, address: String) -> Self {
        if let Ok(mut map) = active.lock() {
            *map.entry(address.clone()).or_insert(0) += 1;
        }
        Self { active, address }
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        if let Ok(mut map) = self.active.lock() {
            if let Some(count) = map.get_mut(&self.address) {
                *count -= 1;
                if *count == 0 {
                    map.remove(&self.address);
                }
            }
        }
        debug!("Channel {} released", self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ksql_core::{Field, FieldValues, Query};

    /// Emits one frame per character of the query text
    struct EchoHandler;

    #[async_trait]
    impl StreamHandler for EchoHandler {
        async fn run_stream(
            &self,
            _settings: &PluginSettings,
            _path: &str,
            query: Query,
        ) -> Result<BoxStream<'static, Result<DataFrame>>> {
            let frames: Vec<_> = query
                .query_text
                .chars()
                .map(|c| {
                    let mut frame = DataFrame::new("response");
                    frame.push_field(Field::new("C", FieldValues::String(vec![c.to_string()])));
                    Ok(frame)
                })
                .collect();
            Ok(stream::iter(frames).boxed())
        }
    }

    fn hub() -> LiveHub {
        LiveHub::new(
            InstanceSettings {
                uid: "uid-1".to_string(),
                ..Default::default()
            },
            Arc::new(EchoHandler),
        )
    }

    #[tokio::test]
    async fn test_open_streams_frames_keyed_by_path() {
        let hub = hub();
        let addr = ChannelAddress::for_query("uid-1", Query::new("A", "abc"));

        let responses: Vec<_> = hub.open(addr).collect().await;
        assert_eq!(responses.len(), 3);
        assert!(responses.iter().all(|r| r.key == "ksql/custom-A-60" && !r.is_error()));
    }

    #[tokio::test]
    async fn test_unknown_namespace_is_refused() {
        let hub = hub();
        let addr = ChannelAddress::for_query("someone-else", Query::new("A", "abc"));

        let responses: Vec<_> = hub.open(addr).collect().await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0].is_error());
    }

    #[tokio::test]
    async fn test_foreign_path_is_refused() {
        let hub = hub();
        let mut addr = ChannelAddress::for_query("uid-1", Query::new("A", "abc"));
        addr.path = "other/path".to_string();

        let responses: Vec<_> = hub.open(addr).collect().await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0].error.as_deref().unwrap_or_default().contains("NotFound"));
    }

    #[tokio::test]
    async fn test_active_channels_follow_stream_lifetime() {
        let hub = hub();
        let addr = ChannelAddress::for_query("uid-1", Query::new("A", "abc"));

        let first = hub.open(addr.clone());
        let second = hub.open(addr);
        assert_eq!(
            hub.active_channels(),
            vec![ChannelInfo {
                address: "ds/uid-1/ksql/custom-A-60".to_string(),
                subscribers: 2,
            }]
        );

        drop(first);
        assert_eq!(hub.active_channels()[0].subscribers, 1);

        let _: Vec<_> = second.collect().await;
        assert!(hub.active_channels().is_empty());
    }
}
