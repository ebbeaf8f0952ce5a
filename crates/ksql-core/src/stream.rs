use crate::channel::CHANNEL_ROOT;
use crate::{DataFrame, PluginSettings, Query, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubscribeStreamStatus {
    Ok,
    NotFound,
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PublishStreamStatus {
    Ok,
    NotFound,
    PermissionDenied,
}

/// Backend side of a live channel
#[async_trait]
pub trait StreamHandler: Send + Sync {
    /// Decide whether a client may subscribe to `path`
    async fn subscribe_stream(&self, path: &str) -> SubscribeStreamStatus {
        if path.starts_with(CHANNEL_ROOT) {
            SubscribeStreamStatus::Ok
        } else {
            SubscribeStreamStatus::NotFound
        }
    }

    /// Clients never publish into query channels
    async fn publish_stream(&self, _path: &str) -> PublishStreamStatus {
        PublishStreamStatus::PermissionDenied
    }

    /// Run the query behind a channel, yielding one frame per result row.
    ///
    /// An `Err` from the returned stream ends the channel.
    async fn run_stream(
        &self,
        settings: &PluginSettings,
        path: &str,
        query: Query,
    ) -> Result<BoxStream<'static, Result<DataFrame>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};

    struct Noop;

    #[async_trait]
    impl StreamHandler for Noop {
        async fn run_stream(
            &self,
            _settings: &PluginSettings,
            _path: &str,
            _query: Query,
        ) -> Result<BoxStream<'static, Result<DataFrame>>> {
            Ok(stream::empty().boxed())
        }
    }

    #[tokio::test]
    async fn test_subscribe_accepts_only_ksql_paths() {
        assert_eq!(Noop.subscribe_stream("ksql/custom-A-60").await, SubscribeStreamStatus::Ok);
        assert_eq!(Noop.subscribe_stream("other/path").await, SubscribeStreamStatus::NotFound);
    }

    #[tokio::test]
    async fn test_publish_is_denied() {
        assert_eq!(
            Noop.publish_stream("ksql/custom-A-60").await,
            PublishStreamStatus::PermissionDenied
        );
    }
}
