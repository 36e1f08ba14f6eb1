//! Opening download sources

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use std::io::Read;

use crate::error::{FastCliError, Result};

/// Expected size of the primary stream when it does not declare one (25 MiB)
pub const FALLBACK_EXPECTED_BYTES: u64 = 26_214_400;

/// A source whose response has arrived and whose body is ready to be read
pub struct OpenedStream {
    /// Raw `Content-Length` header, if the response carried one
    pub content_length: Option<String>,

    /// Response body
    pub body: Box<dyn Read + Send>,
}

impl OpenedStream {
    pub fn new(content_length: Option<String>, body: Box<dyn Read + Send>) -> Self {
        Self {
            content_length,
            body,
        }
    }
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Opens a download source. Implemented over HTTP for real runs.
pub trait Transport {
    /// Issue the request for stream `index` and wait for its response headers
    fn open(&self, index: usize, url: &str) -> Result<OpenedStream>;
}

/// Blocking HTTP transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client that sends `user_agent` on every request
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        info!("Created HTTP transport with user agent '{}'", user_agent);
        Ok(Self::from_client(client))
    }

    /// Use an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(&self, index: usize, url: &str) -> Result<OpenedStream> {
        debug!("Requesting stream {} from {}", index, url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FastCliError::setup(index, url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FastCliError::HttpStatus {
                index,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(
            "Stream {} responded {} with content length {:?}",
            index, status, content_length
        );

        Ok(OpenedStream::new(content_length, Box::new(response)))
    }
}

/// Resolve the expected size of the primary stream from its declared length.
///
/// Only a positive integer is accepted; anything else yields `fallback`.
pub fn resolve_expected_total(content_length: Option<&str>, fallback: u64) -> u64 {
    match content_length.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(length)) if length > 0 => length,
        Some(_) => {
            debug!(
                "Unusable content length {:?}, expecting {} bytes",
                content_length, fallback
            );
            fallback
        }
        None => {
            debug!("No content length declared, expecting {} bytes", fallback);
            fallback
        }
    }
}
