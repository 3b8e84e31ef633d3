//! Connection manager: one owned channel per conversation

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_stream::stream;
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    protocol::{InboundEvent, OutboundIntent},
    transport::{Frames, Transport},
};

/// An open (or failed) session channel for one conversation.
///
/// The channel is released by [`Connection::close`] or when the value is
/// dropped. There is no reconnection: once disconnected, a connection stays
/// disconnected.
pub struct Connection {
    conversation_id: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<InboundEvent>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Open the channel at `url`.
    ///
    /// Never fails: if the transport cannot connect, the failure is logged
    /// and a disconnected connection is returned, whose event sequence is
    /// already finished.
    pub async fn open(transport: &dyn Transport, url: &str, conversation_id: u64) -> Self {
        match transport.connect(url).await {
            Ok(frames) => {
                tracing::info!("Session channel open for conversation {}", conversation_id);
                Self::from_frames(frames, conversation_id)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to open session channel for conversation {}: {}",
                    conversation_id,
                    e
                );
                Self::disconnected(conversation_id)
            }
        }
    }

    /// Wrap already-open frames and start pumping them
    pub fn from_frames(frames: Frames, conversation_id: u64) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(pump(
            frames,
            outbound_rx,
            inbound_tx,
            Arc::clone(&connected),
            cancel.clone(),
        ));

        Self {
            conversation_id,
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
            connected,
            cancel,
            task: Some(task),
        }
    }

    /// A connection that never opened
    pub fn disconnected(conversation_id: u64) -> Self {
        let (_, inbound_rx) = mpsc::unbounded_channel();
        Self {
            conversation_id,
            outbound: None,
            inbound: inbound_rx,
            connected: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn conversation_id(&self) -> u64 {
        self.conversation_id
    }

    /// Whether the channel is currently live
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue an intent for sending. Fire-and-forget: no acknowledgement is
    /// awaited. Rejected without touching the wire when not connected.
    pub fn send(&self, intent: &OutboundIntent) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let outbound = self.outbound.as_ref().ok_or(Error::NotConnected)?;
        let frame = intent.encode()?;
        outbound.send(frame).map_err(|_| Error::NotConnected)
    }

    /// Next inbound event, or `None` once the channel has closed
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        self.inbound.recv().await
    }

    /// Inbound events as a stream that ends when the channel closes
    pub fn events(&mut self) -> impl Stream<Item = InboundEvent> + '_ {
        stream! {
            while let Some(event) = self.inbound.recv().await {
                yield event;
            }
        }
    }

    /// Release the channel. Idempotent.
    pub fn close(&mut self) {
        if self.outbound.take().is_some() {
            tracing::info!("Closing session channel for conversation {}", self.conversation_id);
        }
        self.connected.store(false, Ordering::Release);
        self.cancel.cancel();
        // The pump flushes queued frames and closes the sink on its own.
        self.task.take();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Move frames between the transport and the connection until either side ends
async fn pump(
    frames: Frames,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    inbound_tx: mpsc::UnboundedSender<InboundEvent>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let Frames {
        mut sink,
        mut stream,
    } = frames;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                while let Ok(frame) = outbound_rx.try_recv() {
                    if sink.send(frame).await.is_err() {
                        break;
                    }
                }
                if let Err(e) = sink.close().await {
                    tracing::debug!("Error closing session channel: {}", e);
                }
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    tracing::debug!("<- {}", text);
                    match InboundEvent::decode(&text) {
                        Ok(event) => {
                            if inbound_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("Dropping inbound frame: {}", e),
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("Session channel failed: {}", e);
                    break;
                }
                None => {
                    tracing::info!("Session channel closed by server");
                    break;
                }
            },
            Some(frame) = outbound_rx.recv() => {
                tracing::debug!("-> {}", frame);
                if let Err(e) = sink.send(frame).await {
                    tracing::warn!("Failed to send on session channel: {}", e);
                    break;
                }
            }
        }
    }

    connected.store(false, Ordering::Release);
}
