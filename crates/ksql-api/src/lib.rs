pub mod client;
pub mod handlers;
pub mod live;
pub mod response;
pub mod server;

pub use client::HttpResourceClient;
pub use live::{ChannelInfo, LiveHub};
pub use response::ApiResponse;
pub use server::ApiServer;
