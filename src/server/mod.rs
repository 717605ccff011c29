//! Protocol server
//!
//! Accepts TCP connections and serves the newline-delimited JSON protocol.
//! Each connection runs as its own task with a companion task forwarding
//! broadcast notifications; both write through a shared writer so lines
//! never interleave. Connections are supervised in a `JoinSet` and drained
//! on shutdown.

pub mod broadcaster;
mod handlers;

pub use broadcaster::Broadcaster;
pub use handlers::dispatch;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::metrics::MetricsStore;
use crate::protocol::{write_message, Frame, FrameReader, Message, ServerInfo, Tool, ToolHandler};
use crate::registry::ToolRegistry;
use crate::types::{McpResult, ServerStats};

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// Triggers a graceful server shutdown
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Stop accepting and ask every connection to close after its current request
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// TCP server for the tool protocol
pub struct McpServer {
    info: ServerInfo,
    config: ServerConfig,
    registry: Arc<ToolRegistry>,
    broadcaster: Arc<Broadcaster>,
    clients: Arc<AtomicUsize>,
    connection_seq: AtomicU64,
    shutdown: ShutdownHandle,
}

impl McpServer {
    /// Create a new server with default info
    pub fn new(config: ServerConfig) -> Self {
        Self::with_info(ServerInfo::default(), config)
    }

    /// Create a new server with custom server info
    pub fn with_info(info: ServerInfo, config: ServerConfig) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(config.notification_capacity));
        let registry = Arc::new(ToolRegistry::new(Arc::clone(&broadcaster)));
        let (tx, _) = watch::channel(false);
        Self {
            info,
            config,
            registry,
            broadcaster,
            clients: Arc::new(AtomicUsize::new(0)),
            connection_seq: AtomicU64::new(0),
            shutdown: ShutdownHandle { tx: Arc::new(tx) },
        }
    }

    /// Record every call outcome in `metrics`
    pub fn with_metrics(self, metrics: Arc<MetricsStore>) -> Self {
        if !self.registry.attach_metrics(metrics) {
            warn!("Metrics store already attached; keeping the first one");
        }
        self
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Register a tool with the server
    pub fn register(
        &self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> bool {
        self.registry.register(name, description, input_schema, handler)
    }

    /// Register a self-describing tool
    pub fn register_tool(&self, tool: Box<dyn Tool>) -> bool {
        self.registry.register_tool(tool)
    }

    /// Get the number of registered tools
    pub fn tool_count(&self) -> usize {
        self.registry.len()
    }

    /// Live client count
    pub fn clients(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> ServerStats {
        self.registry.stats(self.clients(), self.broadcaster.dropped())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Bind the configured address
    pub async fn listen(&self) -> McpResult<TcpListener> {
        let listener = TcpListener::bind(self.config.address()).await?;
        Ok(listener)
    }

    /// Bind and serve until shutdown
    pub async fn run(&self) -> McpResult<()> {
        let listener = self.listen().await?;
        self.serve(listener).await
    }

    /// Serve connections from `listener` until shutdown is triggered
    pub async fn serve(&self, listener: TcpListener) -> McpResult<()> {
        let addr = listener.local_addr()?;
        info!(
            "{} v{} listening on {} ({} tool(s))",
            self.info.name,
            self.info.version,
            addr,
            self.tool_count()
        );

        let mut shutdown = self.shutdown.tx.subscribe();
        let mut connections = JoinSet::new();

        while !*shutdown.borrow_and_update() {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let connection = self.connection();
                        connections.spawn(connection.run(stream, peer));
                    }
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                },
                _ = shutdown.changed() => {}
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join(joined);
                }
            }
        }
        drop(listener);

        info!(
            "Shutting down, draining {} connection(s) for up to {:?}",
            connections.len(),
            self.config.shutdown_grace
        );
        let drain = async {
            while let Some(joined) = connections.join_next().await {
                log_join(joined);
            }
        };
        if tokio::time::timeout(self.config.shutdown_grace, drain).await.is_err() {
            warn!(
                "Grace period elapsed, aborting {} connection(s)",
                connections.len()
            );
            connections.shutdown().await;
        }

        let stats = self.stats();
        info!(
            "Server stopped: {} tool(s), {} call(s) ({} ok, {} failed), {} dropped notification(s)",
            stats.tools_registered,
            stats.total_calls,
            stats.successful_calls,
            stats.failed_calls,
            stats.dropped_notifications
        );
        Ok(())
    }

    fn connection(&self) -> Connection {
        let seq = self.connection_seq.fetch_add(1, Ordering::SeqCst) + 1;
        Connection {
            tag: format!("C{:03}", seq),
            registry: Arc::clone(&self.registry),
            broadcaster: Arc::clone(&self.broadcaster),
            clients: Arc::clone(&self.clients),
            shutdown: self.shutdown.tx.subscribe(),
            read_timeout: self.config.read_timeout,
            max_message_bytes: self.config.max_message_bytes,
        }
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!("Connection task panicked: {}", e);
        } else {
            debug!("Connection task cancelled");
        }
    }
}

/// Everything one connection task needs
struct Connection {
    tag: String,
    registry: Arc<ToolRegistry>,
    broadcaster: Arc<Broadcaster>,
    clients: Arc<AtomicUsize>,
    shutdown: watch::Receiver<bool>,
    read_timeout: Duration,
    max_message_bytes: usize,
}

/// Releases per-connection resources even when the task is aborted
struct ConnectionGuard {
    clients: Arc<AtomicUsize>,
    forwarder: AbortHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.forwarder.abort();
        self.clients.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Connection {
    async fn run(mut self, stream: TcpStream, peer: SocketAddr) {
        let tag = self.tag.clone();
        info!("[{}] Client connected from {}", tag, peer);

        let (read_half, write_half) = stream.into_split();
        let writer: SharedWriter = Arc::new(Mutex::new(write_half));

        self.clients.fetch_add(1, Ordering::SeqCst);
        let forwarder = tokio::spawn(forward_notifications(
            tag.clone(),
            self.broadcaster.subscribe(),
            Arc::clone(&writer),
            Arc::clone(&self.broadcaster),
        ));
        let _guard = ConnectionGuard {
            clients: Arc::clone(&self.clients),
            forwarder: forwarder.abort_handle(),
        };

        let mut reader = FrameReader::new(read_half, self.max_message_bytes);
        loop {
            if *self.shutdown.borrow() {
                info!("[{}] Closing for shutdown", tag);
                break;
            }

            let read = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                read = tokio::time::timeout(self.read_timeout, reader.next_frame()) => read,
            };

            let frame = match read {
                Err(_) => {
                    debug!("[{}] No data for {:?}, still waiting", tag, self.read_timeout);
                    continue;
                }
                Ok(Err(e)) => {
                    warn!("[{}] Read error: {}", tag, e);
                    break;
                }
                Ok(Ok(frame)) => frame,
            };

            let response = match frame {
                Frame::Eof => {
                    info!("[{}] Client disconnected", tag);
                    break;
                }
                Frame::Oversized(size) => {
                    warn!(
                        "[{}] Dropped {} byte message (limit {})",
                        tag, size, self.max_message_bytes
                    );
                    handlers::oversized(size, self.max_message_bytes)
                }
                Frame::Invalid(reason) => {
                    debug!("[{}] Undecodable message of invalid UTF-8", tag);
                    Message::error(reason)
                }
                Frame::Line(line) if line.trim().is_empty() => continue,
                Frame::Line(line) => {
                    debug!("[{}] <- {} bytes", tag, line.len());
                    dispatch(&self.registry, &line).await
                }
            };

            if let Message::Error { error, .. } = &response {
                warn!("[{}] Request rejected: {}", tag, error);
            }
            let mut w = writer.lock().await;
            if let Err(e) = write_message(&mut *w, &response).await {
                warn!("[{}] Write failed: {}", tag, e);
                break;
            }
        }

        forwarder.abort();
        let _ = writer.lock().await.shutdown().await;
        info!("[{}] Connection closed", tag);
    }
}

/// Push broadcast notifications to one client until it goes away
async fn forward_notifications(
    tag: String,
    mut rx: broadcast::Receiver<Message>,
    writer: SharedWriter,
    broadcaster: Arc<Broadcaster>,
) {
    loop {
        match rx.recv().await {
            Ok(message) => {
                let mut w = writer.lock().await;
                if let Err(e) = write_message(&mut *w, &message).await {
                    broadcaster.record_dropped(1);
                    warn!("[{}] Notification not delivered: {}", tag, e);
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                broadcaster.record_dropped(missed);
                warn!("[{}] Too slow, {} notification(s) dropped", tag, missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
