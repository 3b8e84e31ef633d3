//! Transport abstraction for the session channel

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use tokio_stream::Stream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};

use crate::error::{Error, Result};

/// Outgoing half of a channel: JSON text frames
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Incoming half of a channel: JSON text frames, ending when the peer closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Both halves of an open channel
pub struct Frames {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Something that can open a text-frame channel to a URL
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel. A single attempt; no retry.
    async fn connect(&self, url: &str) -> Result<Frames>;
}

/// WebSocket transport
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<Frames> {
        let (ws_stream, _response) = connect_async(url).await?;
        let (write, read) = ws_stream.split();

        let sink = write
            .with(|text: String| async move { Ok::<_, WsError>(WsMessage::Text(text)) })
            .sink_map_err(Error::from);

        // Binary, ping and pong frames are not part of the protocol;
        // tungstenite answers pings itself.
        let stream = read.filter_map(|frame| async move {
            match frame {
                Ok(WsMessage::Text(text)) => Some(Ok(text)),
                Ok(WsMessage::Close(reason)) => {
                    tracing::debug!("Server closed session channel: {:?}", reason);
                    None
                }
                Ok(_) => None,
                Err(WsError::ConnectionClosed) => None,
                Err(e) => Some(Err(Error::from(e))),
            }
        });

        Ok(Frames {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}
