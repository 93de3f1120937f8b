use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use crate::error::TransportError;

/// One unit received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Error(String),
    Closed,
}

#[async_trait]
pub trait TransportSession: Send {
    /// Waits for the next frame. Must be cancel-safe: the reconnect loop drops
    /// this future when a stop is requested.
    async fn receive(&mut self) -> Frame;
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn TransportSession>, TransportError>;
}

pub struct WebSocketConnector;

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|source| TransportError::Connect {
                url: url.to_string(),
                source,
            })?;
        Ok(Box::new(WebSocketSession {
            stream,
            closed: false,
        }))
    }
}

pub struct WebSocketSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl TransportSession for WebSocketSession {
    async fn receive(&mut self) -> Frame {
        if self.closed {
            return Frame::Closed;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Frame::Text(text),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "websocket close frame received");
                    return Frame::Closed;
                }
                // Pings are answered by tungstenite itself; binary payloads are not part of the feed.
                Some(Ok(_)) => continue,
                Some(Err(tungstenite::Error::ConnectionClosed)) | None => {
                    self.closed = true;
                    return Frame::Closed;
                }
                Some(Err(err)) => return Frame::Error(err.to_string()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(TransportError::Close(err)),
        }
    }
}
