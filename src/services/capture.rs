//! Live-stream capture primitives
//!
//! A [`StreamSource`] turns a stream URL into a byte stream; [`pump`] drains
//! that stream into a writer while counting bytes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{RecordingError, Result};

/// Raw stream bytes as they arrive
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Opens live streams for capture
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<ByteStream>;
}

/// HTTP(S) stream source backed by reqwest.
///
/// Only the connect phase is bounded; a live stream has no natural end so
/// the overall request is left without a timeout.
pub struct HttpStreamSource {
    client: Client,
}

impl HttpStreamSource {
    pub fn new(user_agent: &str, connect_timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_millis(connect_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| RecordingError::Stream(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl StreamSource for HttpStreamSource {
    async fn open(&self, url: &str) -> Result<ByteStream> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| RecordingError::Stream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Error");
            return Err(RecordingError::Stream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                reason
            )));
        }

        if let Some(len) = response.content_length() {
            tracing::debug!("Stream {} announced {} bytes", url, len);
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)))
            .boxed())
    }
}

/// Byte counter shared between a running capture and its observers
#[derive(Debug, Clone, Default)]
pub struct CaptureProgress {
    bytes: Arc<AtomicU64>,
}

impl CaptureProgress {
    pub fn bytes_written(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    fn add(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }
}

/// Copy `stream` into `writer` until the stream ends, returning the total
/// number of bytes written.
pub async fn pump<W>(mut stream: ByteStream, writer: &mut W, progress: &CaptureProgress) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RecordingError::Stream(e.to_string()))?;
        if chunk.is_empty() {
            continue;
        }
        writer.write_all(&chunk).await?;
        progress.add(chunk.len() as u64);
    }

    Ok(progress.bytes_written())
}
