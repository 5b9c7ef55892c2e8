//! Event-stream transport
//!
//! A transport opens one unidirectional event stream per URL. The returned
//! [`Connection`] yields raw `data:` payloads in the order the producer sent
//! them and is released with [`Connection::close`].

mod http;
mod sse;

#[cfg(test)]
pub mod testing;

pub use http::HttpTransport;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Connection failed: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("Server responded with status {0}")]
    Status(u16),
    #[error("Stream read failed: {0}")]
    Read(#[source] reqwest::Error),
    #[error("Stream ended without an end event")]
    UnexpectedEof,
}

/// Opens event streams
pub trait Transport: Send + Sync {
    /// Construct a connection for `url`.
    ///
    /// Errors here mean the stream could not even be set up; failures of an
    /// established stream come out of [`Connection::next_event`].
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError>;
}

/// One open event stream
#[async_trait]
pub trait Connection: Send {
    /// Next `data:` payload, `Some(Err(_))` on a transport failure, `None`
    /// once the producer has finished.
    async fn next_event(&mut self) -> Option<Result<String, TransportError>>;

    /// Release the underlying connection
    fn close(&mut self);
}

/// Build the request URL for one turn:
/// `{base}/chat_stream/{message}[?checkpoint_id={token}]`
pub fn stream_url(
    base: &Url,
    message: &str,
    checkpoint: Option<&str>,
) -> Result<Url, TransportError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| TransportError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .push("chat_stream")
        .push(message);
    url.set_query(None);
    if let Some(checkpoint) = checkpoint {
        url.query_pairs_mut().append_pair("checkpoint_id", checkpoint);
    }
    Ok(url)
}
