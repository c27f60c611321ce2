//! HTTP segment loading.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::RANGE;
use shoal_core::Segment;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fetch cancelled")]
    Cancelled,
}

/// Fetches a segment's bytes from its origin.
pub trait SegmentFetcher: Send + Sync + 'static {
    fn fetch(&self, segment: &Segment) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// reqwest-backed loader. Honors the segment's byte range.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

/// `Range` header value; HTTP byte ranges are inclusive on both ends.
pub fn range_header(segment: &Segment) -> Option<String> {
    segment
        .byte_range
        .map(|r| format!("bytes={}-{}", r.start, r.end))
}

impl SegmentFetcher for HttpLoader {
    async fn fetch(&self, segment: &Segment) -> Result<Bytes, FetchError> {
        let mut req = self.client.get(&segment.url);
        if let Some(range) = range_header(segment) {
            req = req.header(RANGE, range);
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.bytes().await?)
    }
}
