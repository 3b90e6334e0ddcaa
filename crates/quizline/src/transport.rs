//! WebSocket transport using `tokio-tungstenite`.
//!
//! The listener only accepts TCP connections; the WebSocket upgrade runs
//! in the connection's own task so a slow client can't stall the accept
//! loop. An upgraded connection is split into a [`FrameWriter`] and a
//! [`FrameReader`] so reading never blocks writing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use quizline_protocol::ChannelId;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::TransportError;

/// Counter for generating unique channel IDs.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection and assigns it a channel id.
    pub async fn accept(&self) -> Result<PendingConnection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let id = ChannelId::new(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(channel = %id, %addr, "accepted TCP connection");
        Ok(PendingConnection { id, addr, stream })
    }
}

/// A TCP connection that hasn't completed the WebSocket handshake yet.
pub struct PendingConnection {
    id: ChannelId,
    addr: SocketAddr,
    stream: TcpStream,
}

impl PendingConnection {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Performs the WebSocket handshake.
    pub async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let ws = tokio_tungstenite::accept_async(self.stream)
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;
        tracing::debug!(channel = %self.id, addr = %self.addr, "WebSocket upgraded");
        Ok(WebSocketConnection { id: self.id, ws })
    }
}

/// An upgraded WebSocket connection.
pub struct WebSocketConnection {
    id: ChannelId,
    ws: WsStream,
}

impl WebSocketConnection {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Splits the connection into independent write and read halves.
    pub fn split(self) -> (FrameWriter, FrameReader) {
        let (sink, stream) = self.ws.split();
        (FrameWriter { sink }, FrameReader { stream })
    }
}

/// What [`FrameReader::recv`] yields.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// The payload of a text or binary frame.
    Data(Vec<u8>),
    /// A ping or pong. Carries nothing, but proves the peer is alive.
    Heartbeat,
}

/// Write half of a connection.
pub struct FrameWriter {
    sink: SplitSink<WsStream, Message>,
}

impl FrameWriter {
    /// Sends one text frame.
    pub async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink.send(Message::Text(text.into())).await.map_err(send_failed)
    }

    /// Sends a keepalive ping.
    pub async fn ping(&mut self) -> Result<(), TransportError> {
        self.sink
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(send_failed)
    }

    /// Sends a close frame.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(send_failed)
    }
}

/// Read half of a connection.
pub struct FrameReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader {
    /// Receives the next frame, or `None` once the peer closed.
    ///
    /// Cancel-safe: dropping the future loses no frame.
    pub async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Frame::Data(text.as_bytes().to_vec())));
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(Frame::Data(data.into()))),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => return Ok(Some(Frame::Heartbeat)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }
}

fn send_failed(e: tokio_tungstenite::tungstenite::Error) -> TransportError {
    TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
}
