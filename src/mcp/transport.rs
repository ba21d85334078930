use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::mcp::{
    errors::{MCPError, MCPResult, TransportError},
    protocol::{MCPMessage, MessageParser},
};

/// Transport types supported by the MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    WebSocket,
    Stdio,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::WebSocket => write!(f, "websocket"),
            TransportType::Stdio => write!(f, "stdio"),
        }
    }
}

/// Abstract transport trait for MCP communication
#[async_trait]
pub trait MCPTransport: Send + Sync {
    /// Queue a message for delivery
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()>;

    /// Receive the next inbound message.
    ///
    /// A frame that is not valid JSON-RPC yields a `Protocol` error and the
    /// transport stays usable; a `Transport` error means the peer is gone.
    async fn receive(&mut self) -> MCPResult<MCPMessage>;

    /// Flush queued messages and close the connection
    async fn close(&mut self) -> MCPResult<()>;

    /// Whether outbound messages can still be delivered
    fn is_connected(&self) -> bool;

    fn transport_type(&self) -> TransportType;
}

/// Channel plumbing shared by the transports: a reader task feeding parsed
/// messages in, and a writer task draining queued messages out.
struct Pipes {
    outgoing: Option<mpsc::UnboundedSender<MCPMessage>>,
    incoming: mpsc::UnboundedReceiver<MCPResult<MCPMessage>>,
    connected: Arc<AtomicBool>,
    writer: Option<JoinHandle<()>>,
    reader: JoinHandle<()>,
}

impl Pipes {
    fn send(&self, message: MCPMessage, label: &str) -> MCPResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(MCPError::Transport(TransportError::ConnectionLost(format!(
                "{} connection is closed",
                label
            ))));
        }

        let sender = self
            .outgoing
            .as_ref()
            .ok_or(MCPError::Transport(TransportError::Closed))?;

        sender.send(message).map_err(|_| {
            MCPError::Transport(TransportError::ConnectionLost(format!(
                "{} sender channel closed",
                label
            )))
        })
    }

    async fn receive(&mut self, label: &str) -> MCPResult<MCPMessage> {
        self.incoming.recv().await.unwrap_or_else(|| {
            Err(MCPError::Transport(TransportError::ConnectionLost(format!(
                "{} input closed",
                label
            ))))
        })
    }

    async fn close(&mut self) {
        // Dropping the sender lets the writer drain what is queued and exit.
        self.outgoing.take();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                warn!("Transport writer task failed: {}", e);
            }
        }
        self.reader.abort();
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Newline-delimited JSON-RPC over a reader/writer pair (stdin/stdout by default)
pub struct StdioTransport {
    pipes: Pipes,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self::with_io(tokio::io::stdin(), tokio::io::stdout())
    }

    pub fn with_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<MCPMessage>();
        let connected = Arc::new(AtomicBool::new(true));

        let writer_connected = connected.clone();
        let writer = tokio::spawn(async move {
            let mut writer = writer;
            let mut out_rx = out_rx;
            while let Some(message) = out_rx.recv().await {
                let mut data = match MessageParser::serialize_message(&message) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };
                data.push(b'\n');

                let written = async {
                    writer.write_all(&data).await?;
                    writer.flush().await
                }
                .await;

                if let Err(e) = written {
                    error!("Failed to write to stdout: {}", e);
                    writer_connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = Vec::new();

            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => {
                        debug!("Stdin reached end of input");
                        break;
                    }
                    Ok(_) => {
                        // Invalid UTF-8 fails this line only.
                        let data = line.trim_ascii();
                        if data.is_empty() {
                            continue;
                        }

                        let parsed = MessageParser::parse_message(data);
                        if let Err(e) = &parsed {
                            warn!("Failed to parse MCP message from stdin: {}", e);
                        }
                        if in_tx.send(parsed).is_err() {
                            debug!("Receiver dropped, closing stdio input");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to read from stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Self {
            pipes: Pipes {
                outgoing: Some(out_tx),
                incoming: in_rx,
                connected,
                writer: Some(writer),
                reader,
            },
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MCPTransport for StdioTransport {
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()> {
        self.pipes.send(message, "Stdio")
    }

    async fn receive(&mut self) -> MCPResult<MCPMessage> {
        self.pipes.receive("Stdio").await
    }

    async fn close(&mut self) -> MCPResult<()> {
        self.pipes.close().await;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pipes.connected.load(Ordering::SeqCst)
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }
}

/// One JSON-RPC message per WebSocket text or binary frame
pub struct WebSocketTransport {
    pipes: Pipes,
}

impl WebSocketTransport {
    /// Perform the WebSocket handshake on an accepted TCP stream
    pub async fn new(stream: tokio::net::TcpStream) -> MCPResult<Self> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| MCPError::Transport(TransportError::WebSocket(e)))?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<MCPMessage>();
        let connected = Arc::new(AtomicBool::new(true));

        let writer_connected = connected.clone();
        let writer = tokio::spawn(async move {
            let mut out_rx = out_rx;
            while let Some(message) = out_rx.recv().await {
                let data = match MessageParser::serialize_message(&message) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };

                let frame = WsMessage::Text(String::from_utf8_lossy(&data).into_owned());
                if let Err(e) = ws_sender.send(frame).await {
                    error!("Failed to send WebSocket message: {}", e);
                    writer_connected.store(false, Ordering::SeqCst);
                    return;
                }
            }

            if let Err(e) = ws_sender.close().await {
                debug!("WebSocket close handshake failed: {}", e);
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_receiver.next().await {
                let parsed = match frame {
                    Ok(WsMessage::Text(text)) => MessageParser::parse_message(text.as_bytes()),
                    Ok(WsMessage::Binary(data)) => MessageParser::parse_message(&data),
                    Ok(WsMessage::Close(_)) => {
                        info!("WebSocket connection closed by client");
                        break;
                    }
                    Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Frame(_)) => {
                        continue;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                };

                if let Err(e) = &parsed {
                    warn!("Failed to parse MCP message: {}", e);
                }
                if in_tx.send(parsed).is_err() {
                    debug!("Receiver dropped, closing WebSocket input");
                    break;
                }
            }
        });

        Ok(Self {
            pipes: Pipes {
                outgoing: Some(out_tx),
                incoming: in_rx,
                connected,
                writer: Some(writer),
                reader,
            },
        })
    }
}

#[async_trait]
impl MCPTransport for WebSocketTransport {
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()> {
        self.pipes.send(message, "WebSocket")
    }

    async fn receive(&mut self) -> MCPResult<MCPMessage> {
        self.pipes.receive("WebSocket").await
    }

    async fn close(&mut self) -> MCPResult<()> {
        self.pipes.close().await;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pipes.connected.load(Ordering::SeqCst)
    }

    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }
}
