//! Random access to a remote file through HTTP range requests.

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_LENGTH;
use reqwest::header::CONTENT_RANGE;
use reqwest::header::RANGE;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::ExtractionError;
use crate::Result;
use crate::source::TransportConfig;

/// Smallest amount fetched per range request (64KB).
pub const MIN_FETCH_SIZE: usize = 64 * 1024;

/// Transport failure surfaced through `std::io::Error`.
///
/// The `zip` crate only sees `io::Error`s from the reader; this marker lets
/// the access layer tell network failures apart from local I/O failures.
#[derive(Debug, Error)]
#[error("{0}")]
struct TransportError(String);

fn transport_error(message: impl Into<String>) -> io::Error {
    io::Error::other(TransportError(message.into()))
}

/// Converts an I/O error to `Network` if it came from the HTTP transport.
pub(crate) fn classify_io(err: io::Error) -> ExtractionError {
    if err
        .get_ref()
        .is_some_and(|inner| inner.is::<TransportError>())
    {
        ExtractionError::Network(err.to_string())
    } else {
        ExtractionError::Io(err)
    }
}

/// A `Read + Seek` view of a remote file.
///
/// Reads are served from a window filled by one `Range` request per miss, so
/// reading the ZIP central directory and a handful of members costs a few
/// requests rather than a full download. All calls block; there is no
/// cancellation.
pub struct HttpRangeReader {
    client: Client,
    url: Url,
    len: u64,
    pos: u64,
    window: Vec<u8>,
    window_start: u64,
    requests: u64,
}

impl HttpRangeReader {
    /// Connects to `url` and discovers the resource length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unusable proxy URL and `Network` if the
    /// server cannot be reached, answers with an error status, or does not
    /// report the resource length.
    pub fn connect(url: &Url, transport: &TransportConfig) -> Result<Self> {
        let client = build_client(transport)?;
        let len = discover_length(&client, url)?;

        debug!(url = %url, len, "remote archive length discovered");

        Ok(Self {
            client,
            url: url.clone(),
            len,
            pos: 0,
            window: Vec::new(),
            window_start: 0,
            requests: 0,
        })
    }

    /// Total length of the remote resource in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the remote resource is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of range requests issued so far.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests
    }

    fn window_end(&self) -> u64 {
        self.window_start + self.window.len() as u64
    }

    fn fill(&mut self, start: u64, wanted: usize) -> io::Result<()> {
        let size = wanted.max(MIN_FETCH_SIZE) as u64;
        let end = start.saturating_add(size).min(self.len) - 1;

        let response = self
            .client
            .get(self.url.clone())
            .header(RANGE, format!("bytes={start}-{end}"))
            .send()
            .map_err(|e| transport_error(format!("range request failed: {e}")))?;
        self.requests += 1;

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(transport_error(format!(
                "server did not honour range request bytes={start}-{end} (HTTP {})",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| transport_error(format!("failed to read range response: {e}")))?;
        if body.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "empty range response",
            ));
        }

        debug!(start, end, received = body.len(), "fetched remote range");

        self.window = body.to_vec();
        self.window_start = start;
        Ok(())
    }
}

impl Read for HttpRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.len {
            return Ok(0);
        }

        if self.pos < self.window_start || self.pos >= self.window_end() {
            self.fill(self.pos, buf.len())?;
        }

        let offset = usize::try_from(self.pos - self.window_start)
            .map_err(|_| io::Error::other("window offset overflow"))?;
        let available = &self.window[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };

        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        self.pos = target;
        Ok(target)
    }
}

fn build_client(transport: &TransportConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("firmex/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(transport.insecure)
        .timeout(None::<std::time::Duration>);

    if let Some(proxy) = &transport.proxy {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ExtractionError::InvalidConfig {
            reason: format!("invalid proxy '{proxy}': {e}"),
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ExtractionError::Network(format!("failed to build HTTP client: {e}")))
}

fn discover_length(client: &Client, url: &Url) -> Result<u64> {
    let network = |e: reqwest::Error| ExtractionError::Network(e.to_string());

    let head = client.head(url.clone()).send().map_err(network)?;
    if head.status().is_success() {
        if let Some(len) = header_u64(&head, CONTENT_LENGTH).filter(|len| *len > 0) {
            return Ok(len);
        }
    } else {
        debug!(url = %url, status = %head.status(), "HEAD rejected, falling back to a ranged GET");
    }

    // Some servers refuse HEAD or omit Content-Length; ask for the first byte instead.
    let probe = client
        .get(url.clone())
        .header(RANGE, "bytes=0-0")
        .send()
        .map_err(network)?;
    ensure_success(&probe)?;
    probe
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_range_total)
        .ok_or_else(|| {
            ExtractionError::Network(format!(
                "{url} does not report its length; range requests are required for remote extraction"
            ))
        })
}

fn ensure_success(response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ExtractionError::Network(format!(
            "{} answered HTTP {status}",
            response.url()
        )))
    }
}

fn header_u64(response: &Response, name: reqwest::header::HeaderName) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Parses the total length out of a `Content-Range` value such as
/// `bytes 0-0/1234`. Returns `None` for an unknown (`*`) total.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (_, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}
