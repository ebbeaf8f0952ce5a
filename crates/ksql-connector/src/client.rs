use crate::decode::{decode_header, decode_row, QueryHeader, Row};
use bytes::BytesMut;
use futures::stream::{BoxStream, StreamExt};
use ksql_core::{Error, PluginSettings, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io;
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

/// Media type of the line-delimited push query protocol
pub const DELIMITED_CONTENT_TYPE: &str = "application/vnd.ksqlapi.delimited.v1";

/// Longest header or row line buffered from a push query
pub const MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

/// Answer of the ksqlDB `/healthcheck` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerHealth {
    pub is_healthy: bool,
    #[serde(default)]
    pub details: Value,
}

/// A running push query: its header and the rows that follow
pub struct PushQuery {
    pub header: QueryHeader,
    pub rows: BoxStream<'static, Result<Row>>,
}

/// Thin client for the ksqlDB REST API
#[derive(Clone)]
pub struct KsqlClient {
    base_url: String,
    http: Client,
    credentials: Option<(String, String)>,
    max_line_length: usize,
}

impl KsqlClient {
    /// Build a client for the configured server.
    ///
    /// With `http` set, requests use plaintext HTTP/2 with prior knowledge.
    pub fn new(settings: &PluginSettings) -> Result<Self> {
        if settings.ksqlserver.is_empty() {
            return Err(Error::Configuration(
                "KsqlDB server is a mandatory parameter".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if settings.http {
            builder = builder.http2_prior_knowledge();
        }

        let http = builder
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: settings.ksqlserver.trim_end_matches('/').to_string(),
            http,
            credentials: settings
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
            max_line_length: MAX_LINE_LENGTH,
        })
    }

    /// Lines longer than `max` are dropped with a decode error
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }

    pub async fn health(&self) -> Result<ServerHealth> {
        let url = format!("{}/healthcheck", self.base_url);
        debug!("Checking ksqlDB health at {}", url);

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Failed to reach ksqlDB: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "ksqlDB health check returned {}: {}",
                status, body
            )));
        }

        response
            .json::<ServerHealth>()
            .await
            .map_err(|e| Error::Connection(format!("Invalid health response: {}", e)))
    }

    /// Start a push query and wait for its header.
    ///
    /// The query runs until the returned row stream is dropped or the
    /// server closes the response.
    pub async fn push(&self, sql: &str) -> Result<PushQuery> {
        let url = format!("{}/query-stream", self.base_url);
        info!("Starting push query on {}", self.base_url);

        let response = self
            .authorize(self.http.post(&url))
            .header(reqwest::header::ACCEPT, DELIMITED_CONTENT_TYPE)
            .json(&json!({ "sql": sql, "properties": {} }))
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Failed to start push query: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "ksqlDB rejected push query with {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
        let mut lines = FramedRead::new(
            StreamReader::new(Box::pin(bytes)),
            RowLines::new(self.max_line_length),
        );
        let max_line_length = self.max_line_length;

        let header = loop {
            match lines.next().await {
                Some(Ok(Line::Text(line))) if line.trim().is_empty() => continue,
                Some(Ok(Line::Text(line))) => break decode_header(&line)?,
                Some(Ok(Line::Oversized)) => {
                    return Err(Error::Decode(format!(
                        "query header exceeds {} bytes",
                        max_line_length
                    )))
                }
                Some(Err(e)) => return Err(Error::Decode(e.to_string())),
                None => {
                    return Err(Error::Connection(
                        "Push query closed before sending a header".to_string(),
                    ))
                }
            }
        };

        debug!(
            "Push query {:?} started with columns {:?}",
            header.query_id, header.column_names
        );

        let rows = lines
            .filter_map(move |line| async move {
                match line {
                    Ok(Line::Text(line)) if line.trim().is_empty() => None,
                    Ok(Line::Text(line)) => Some(decode_row(&line)),
                    Ok(Line::Oversized) => Some(Err(Error::Decode(format!(
                        "row exceeds {} bytes",
                        max_line_length
                    )))),
                    Err(e) => Some(Err(Error::Decode(e.to_string()))),
                }
            })
            .boxed();

        Ok(PushQuery { header, rows })
    }
}

enum Line {
    Text(String),
    Oversized,
}

/// Line codec that reports an oversized line as an item instead of failing
/// the whole stream, so decoding resumes after the next newline.
struct RowLines {
    inner: LinesCodec,
}

impl RowLines {
    fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }

    fn lift(
        result: std::result::Result<Option<String>, LinesCodecError>,
    ) -> std::result::Result<Option<Line>, LinesCodecError> {
        match result {
            Ok(line) => Ok(line.map(Line::Text)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Line::Oversized)),
            Err(e) => Err(e),
        }
    }
}

impl Decoder for RowLines {
    type Item = Line;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> std::result::Result<Option<Line>, LinesCodecError> {
        Self::lift(self.inner.decode(buf))
    }

    fn decode_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> std::result::Result<Option<Line>, LinesCodecError> {
        Self::lift(self.inner.decode_eof(buf))
    }
}
