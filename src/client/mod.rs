//! Protocol client
//!
//! One TCP session with strict request/response pairing: every request waits
//! for exactly one reply. Notifications that arrive while a reply is pending
//! are queued rather than mistaken for it.

use std::collections::VecDeque;
use std::net::SocketAddr;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::protocol::{write_message, CallOutcome, Frame, FrameReader, McpTool, Message};
use crate::types::{McpError, McpResult};

struct Session {
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
}

/// Client for the tool protocol
pub struct McpClient {
    config: ClientConfig,
    session: Option<Session>,
    tools: Vec<McpTool>,
    notifications: VecDeque<Message>,
}

impl McpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: None,
            tools: Vec::new(),
            notifications: VecDeque::new(),
        }
    }

    /// Open a session and load the server's tool list.
    ///
    /// On any failure the client is left disconnected.
    pub async fn connect(&mut self, host: &str, port: u16) -> McpResult<()> {
        self.disconnect().await;

        let address = format!("{}:{}", host, port);
        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(&address)).await
        {
            Ok(stream) => stream?,
            Err(_) => return Err(McpError::Timeout(self.config.connect_timeout)),
        };
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        self.session = Some(Session {
            reader: FrameReader::new(read_half, self.config.max_message_bytes),
            writer: write_half,
            peer,
        });

        if let Err(e) = self.refresh_tools().await {
            warn!("Initial tool listing from {} failed: {}", peer, e);
            self.disconnect().await;
            return Err(e);
        }
        info!("Connected to {} ({} tool(s))", peer, self.tools.len());
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.session.as_ref().map(|s| s.peer)
    }

    /// Tools from the most recent listing
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// Drain notifications received so far
    pub fn take_notifications(&mut self) -> Vec<Message> {
        self.notifications.drain(..).collect()
    }

    /// Send one request and wait for its reply.
    ///
    /// A timeout, EOF or I/O failure closes the session. An oversized or
    /// undecodable reply is reported as [`McpError::Framing`] and the
    /// session stays usable.
    pub async fn send_message(&mut self, message: &Message) -> McpResult<Message> {
        let session = self.session.as_mut().ok_or(McpError::NotConnected)?;
        let result = exchange(
            session,
            message,
            &self.config,
            &mut self.notifications,
        )
        .await;

        if let Err(e) = &result {
            if e.is_connection_level() {
                warn!("Session closed: {}", e);
                self.disconnect().await;
            }
        }
        result
    }

    /// Refresh the tool cache; failures leave it empty
    pub async fn list_tools(&mut self) -> Vec<McpTool> {
        if let Err(e) = self.refresh_tools().await {
            warn!("Listing tools failed: {}", e);
            self.tools.clear();
        }
        self.tools.clone()
    }

    async fn refresh_tools(&mut self) -> McpResult<()> {
        match self.send_message(&Message::ListTools).await? {
            Message::ToolsList { tools, .. } => {
                self.tools = tools;
                Ok(())
            }
            Message::Error { error, .. } => Err(McpError::Remote(error)),
            other => Err(unexpected(&other)),
        }
    }

    /// Call a tool by name
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> McpResult<CallOutcome> {
        match self.send_message(&Message::call_tool(name, arguments)).await? {
            Message::CallToolResponse(outcome) => Ok(outcome),
            Message::Error { error, .. } => Err(McpError::Remote(error)),
            other => Err(unexpected(&other)),
        }
    }

    /// Close the session; calling it again is a no-op
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.writer.shutdown().await {
                debug!("Shutdown of {} failed: {}", session.peer, e);
            }
            info!("Disconnected from {}", session.peer);
        }
    }
}

impl Default for McpClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

async fn exchange(
    session: &mut Session,
    message: &Message,
    config: &ClientConfig,
    notifications: &mut VecDeque<Message>,
) -> McpResult<Message> {
    write_message(&mut session.writer, message).await?;
    debug!("-> {}", message.message_type());

    let deadline = Instant::now() + config.response_timeout;
    loop {
        let frame = match timeout_at(deadline, session.reader.next_frame()).await {
            Ok(frame) => frame?,
            Err(_) => return Err(McpError::Timeout(config.response_timeout)),
        };

        match frame {
            Frame::Eof => return Err(McpError::ConnectionClosed),
            Frame::Oversized(size) => {
                return Err(McpError::Framing(format!(
                    "response of {} bytes exceeds the {} byte limit",
                    size, config.max_message_bytes
                )))
            }
            Frame::Invalid(reason) => return Err(McpError::Framing(reason)),
            Frame::Line(line) if line.trim().is_empty() => continue,
            Frame::Line(line) => {
                let reply = Message::decode(&line)?;
                if reply.is_notification() {
                    debug!("<- notification {}", reply.message_type());
                    notifications.push_back(reply);
                    continue;
                }
                debug!("<- {}", reply.message_type());
                return Ok(reply);
            }
        }
    }
}

fn unexpected(message: &Message) -> McpError {
    McpError::Framing(format!("Unexpected response type: {}", message.message_type()))
}
