mod client;
mod decode;
mod handler;

pub use client::{KsqlClient, PushQuery, ServerHealth, DELIMITED_CONTENT_TYPE};
pub use decode::{
    decode_header, decode_row, row_to_frame, QueryHeader, Row, DATETIME_COLUMN, FRAME_NAME,
};
pub use handler::{check_health, KsqlStreamHandler};
