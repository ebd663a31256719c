use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;

/// Block size for staging and uploading payloads, 1 MiB.
pub const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed reading response body: {0}")]
    Body(#[from] io::Error),

    #[error("response body is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

pub type ByteStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// The status and streamed body of a GET request.
pub struct FetchResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl FetchResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        FetchResponse { status, body }
    }

    /// Only a 200 counts, redirects are followed by the client already.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Collect the whole body in memory and decode it as UTF-8.
    pub async fn text(self) -> Result<String, FetchError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let body = chunks.concat();
        Ok(String::from_utf8(body)?)
    }

    pub fn into_reader(self) -> Pin<Box<dyn AsyncRead + Send>> {
        Box::pin(StreamReader::new(self.body))
    }
}

/// Fill `buf` as far as the reader allows.  Returns 0 at end of input, a
/// short count only on the last block.
pub async fn read_block<R: AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Retrieve a resource over HTTP with a streamed body.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(HttpFetcher { client })
    }
}

#[async_trait]
impl RemoteFetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes_stream().map(|r| r.map_err(io::Error::other)).boxed();
        Ok(FetchResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn chunked(parts: Vec<&'static [u8]>) -> ByteStream {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p)))).boxed()
    }

    #[tokio::test]
    async fn text_joins_chunks() {
        let resp = FetchResponse::new(200, chunked(vec![b"LocationID,", b"Borough\n"]));
        assert!(resp.is_success());
        assert_eq!(resp.text().await.unwrap(), "LocationID,Borough\n");
    }

    #[tokio::test]
    async fn text_rejects_invalid_utf8() {
        let resp = FetchResponse::new(200, chunked(vec![b"\xff\xfe"]));
        assert!(matches!(resp.text().await, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn reader_streams_body() {
        let resp = FetchResponse::new(200, chunked(vec![b"PAR1", b"....", b"PAR1"]));
        let mut buf = Vec::new();
        resp.into_reader().read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"PAR1....PAR1");
    }

    #[tokio::test]
    async fn read_block_fills_across_short_reads() -> Result<(), Box<dyn std::error::Error>> {
        let mut reader = FetchResponse::new(200, chunked(vec![b"abc", b"def", b"ghij"])).into_reader();
        let mut buf = [0u8; 8];
        assert_eq!(read_block(&mut reader, &mut buf).await?, 8);
        assert_eq!(&buf, b"abcdefgh");
        assert_eq!(read_block(&mut reader, &mut buf).await?, 2);
        assert_eq!(read_block(&mut reader, &mut buf).await?, 0);
        Ok(())
    }

    #[test]
    fn only_200_is_success() {
        assert!(!FetchResponse::new(403, chunked(vec![])).is_success());
        assert!(!FetchResponse::new(204, chunked(vec![])).is_success());
    }

    #[ignore]
    #[tokio::test]
    async fn get_lookup_table() -> Result<(), Box<dyn std::error::Error>> {
        let fetcher = HttpFetcher::new()?;
        let resp = fetcher
            .get("https://d37ci6vzurychx.cloudfront.net/misc/taxi_zone_lookup.csv")
            .await?;
        assert_eq!(resp.status, 200);
        let text = resp.text().await?;
        assert!(text.starts_with("\"LocationID\""));
        Ok(())
    }
}
