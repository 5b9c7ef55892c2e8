//! HTTP event-stream transport built on reqwest

use super::sse::SseDecoder;
use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Request, Url};
use std::collections::VecDeque;
use std::time::Duration;

/// Opens `text/event-stream` GET requests
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `connect_timeout` bounds connection setup only; an established
    /// stream may stay silent indefinitely.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(url.to_string()));
        }
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .build()
            .map_err(TransportError::Client)?;
        Ok(Box::new(HttpConnection {
            client: self.client.clone(),
            state: ConnectionState::Pending(request),
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
        }))
    }
}

enum ConnectionState {
    /// Request built, not sent yet; it goes out on the first read
    Pending(Request),
    Streaming(BoxStream<'static, reqwest::Result<Bytes>>),
    Closed,
}

struct HttpConnection {
    client: Client,
    state: ConnectionState,
    decoder: SseDecoder,
    /// Decoded payloads not handed out yet
    ready: VecDeque<String>,
}

#[async_trait]
impl Connection for HttpConnection {
    async fn next_event(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            if let Some(data) = self.ready.pop_front() {
                return Some(Ok(data));
            }

            // Leaves `Closed` behind on every early return
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Closed => return None,

                ConnectionState::Pending(request) => {
                    tracing::debug!(url = %request.url(), "Connecting event stream");
                    let response = match self.client.execute(request).await {
                        Ok(response) => response,
                        Err(e) => return Some(Err(TransportError::Connect(e))),
                    };
                    let status = response.status();
                    if !status.is_success() {
                        return Some(Err(TransportError::Status(status.as_u16())));
                    }
                    self.state = ConnectionState::Streaming(response.bytes_stream().boxed());
                }

                ConnectionState::Streaming(mut body) => match body.next().await {
                    Some(Ok(chunk)) => {
                        self.ready.extend(self.decoder.push(&chunk));
                        self.state = ConnectionState::Streaming(body);
                    }
                    Some(Err(e)) => return Some(Err(TransportError::Read(e))),
                    None => self.ready.extend(self.decoder.finish()),
                },
            }
        }
    }

    fn close(&mut self) {
        // Dropping the body stream releases the underlying connection
        self.state = ConnectionState::Closed;
        self.ready.clear();
    }
}
