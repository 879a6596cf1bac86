//! Transport seam between the connection manager and the network.
//!
//! The manager only sees [`Transport`] (one handshake per call) and the
//! [`FrameStream`] it yields. [`WebSocketTransport`] is the production
//! implementation; tests substitute `testing::ScriptedTransport`.

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::ConnectionError;

/// Close code reserved for intentional shutdown
pub const NORMAL_CLOSURE: u16 = 1000;

/// One inbound transport frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close { code: Option<u16>, reason: String },
}

/// Factory for connected frame streams
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one handshake.
    async fn connect(&self) -> Result<Box<dyn FrameStream>, ConnectionError>;

    /// Human-readable endpoint for log lines
    fn endpoint(&self) -> String;
}

/// An established connection
///
/// `next_frame` must be cancel-safe: the manager races it against timers
/// and drops the pending future when a timer wins.
#[async_trait]
pub trait FrameStream: Send {
    /// Next data or close frame; `None` when the stream ended without one.
    async fn next_frame(&mut self) -> Option<Result<Frame, ConnectionError>>;

    /// Send a close frame with `code`.
    async fn close(&mut self, code: u16) -> Result<(), ConnectionError>;
}

/// WebSocket client transport built on tokio-tungstenite
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: Url,
}

impl WebSocketTransport {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn from_config(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        config.endpoint().map(Self::new)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self) -> Result<Box<dyn FrameStream>, ConnectionError> {
        let (stream, response) = connect_async(self.url.as_str()).await.map_err(|err| {
            ConnectionError::ConnectFailed {
                reason: err.to_string(),
            }
        })?;
        debug!(
            "[WebSocketTransport] Handshake with {} completed (status {})",
            self.url,
            response.status()
        );
        Ok(Box::new(WebSocketFrames { inner: stream }))
    }

    fn endpoint(&self) -> String {
        self.url.to_string()
    }
}

struct WebSocketFrames {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameStream for WebSocketFrames {
    async fn next_frame(&mut self) -> Option<Result<Frame, ConnectionError>> {
        loop {
            let message = match self.inner.next().await? {
                Ok(message) => message,
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return None,
                Err(err) => {
                    return Some(Err(ConnectionError::Transport {
                        details: err.to_string(),
                    }))
                }
            };

            let frame = match message {
                Message::Text(text) => Frame::Text(text),
                Message::Binary(bytes) => Frame::Binary(bytes),
                Message::Close(close) => Frame::Close {
                    code: close.as_ref().map(|frame| u16::from(frame.code)),
                    reason: close
                        .map(|frame| frame.reason.into_owned())
                        .unwrap_or_default(),
                },
                // pings are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self, code: u16) -> Result<(), ConnectionError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        match self.inner.close(Some(frame)).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(ConnectionError::Transport {
                details: err.to_string(),
            }),
        }
    }
}
