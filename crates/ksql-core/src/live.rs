use crate::{ChannelAddress, DataQueryResponse};
use futures::stream::BoxStream;

/// Host service multiplexing live channels over one transport.
///
/// The returned stream is owned by the caller; dropping it ends the
/// subscription.
pub trait LiveStreamService: Send + Sync {
    fn get_data_stream(&self, addr: ChannelAddress) -> BoxStream<'static, DataQueryResponse>;
}
