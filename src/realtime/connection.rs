/// Physical connection handle and its driver task
///
/// One `Connection` wraps one persistent WebSocket plus everything scoped to
/// it: lifecycle state, the outbound queue replayed on open, the wire-level
/// dedup cache, keepalive, reconnection backoff and the frame listener set.
/// The driver task owns the socket; handles talk to it through a command
/// channel and observe it through a state watch. Connections are owned by the
/// pool and never torn down implicitly - dropping listeners or handles leaves
/// the link up until an explicit disconnect.
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::arguments::is_debug_realtime_enabled;
use crate::config::RealtimeConfig;
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};

use super::dedup::FrameDedup;
use super::keepalive::{KeepaliveConfig, KeepaliveDriver};
use super::listeners::{ListenerHandle, ListenerSet};
use super::message::{parse_frame, ClientFrame, ServerFrame, UpdateFrame};
use super::metrics::{LinkMetrics, LinkMetricsSnapshot};
use super::reconnect::{ReconnectPhase, ReconnectPolicy};

// ============================================================================
// KEYS AND LIFECYCLE STATE
// ============================================================================

/// Coarse category of connection usage, part of the pooling key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelClass {
    /// Research mission updates
    Research,
    /// Document processing updates
    Documents,
}

impl ChannelClass {
    pub fn code(&self) -> &'static str {
        match self {
            ChannelClass::Research => "research",
            ChannelClass::Documents => "documents",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "research" => Some(ChannelClass::Research),
            "documents" => Some(ChannelClass::Documents),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Pooling key: at most one live connection exists per key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnKey {
    pub class: ChannelClass,
    pub endpoint: String,
}

impl ConnKey {
    pub fn new(class: ChannelClass, endpoint: impl Into<String>) -> Self {
        Self {
            class,
            endpoint: endpoint.into(),
        }
    }
}

impl std::fmt::Display for ConnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.class.code(), self.endpoint)
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Commands from handles to the driver task
enum ConnCommand {
    Send(String),
    Close,
}

/// How an open link ended
enum CloseKind {
    /// Client-initiated close; no reconnection
    Clean,
    /// Transport failure or server-side close; reconnection policy applies
    Unclean,
}

type ReopenHook = Arc<dyn Fn() -> Vec<ClientFrame> + Send + Sync>;
type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

// ============================================================================
// CONNECTION
// ============================================================================

pub struct Connection {
    key: ConnKey,
    url: String,
    cfg: RealtimeConfig,
    state_tx: watch::Sender<LinkState>,
    shutdown_tx: watch::Sender<bool>,
    cmd_tx: mpsc::UnboundedSender<ConnCommand>,
    pending: Mutex<VecDeque<String>>,
    frame_listeners: Arc<ListenerSet<ServerFrame>>,
    reopen_hooks: Mutex<HashMap<u64, ReopenHook>>,
    next_hook_id: AtomicU64,
    reconnect: Mutex<ReconnectPolicy>,
    metrics: Arc<LinkMetrics>,
}

impl Connection {
    /// Create the connection and spawn its driver task
    pub(crate) fn spawn(key: ConnKey, url: String, cfg: RealtimeConfig) -> Arc<Self> {
        let (state_tx, _) = watch::channel(LinkState::Idle);
        let (shutdown_tx, _) = watch::channel(false);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let reconnect = ReconnectPolicy::new(
            Duration::from_millis(cfg.reconnect_base_delay_ms),
            Duration::from_secs(cfg.reconnect_max_delay_secs),
            cfg.reconnect_max_attempts,
        );

        let conn = Arc::new(Self {
            key,
            url,
            cfg,
            state_tx,
            shutdown_tx,
            cmd_tx,
            pending: Mutex::new(VecDeque::new()),
            frame_listeners: ListenerSet::new(),
            reopen_hooks: Mutex::new(HashMap::new()),
            next_hook_id: AtomicU64::new(1),
            reconnect: Mutex::new(reconnect),
            metrics: LinkMetrics::new(),
        });

        tokio::spawn(drive(conn.clone(), cmd_rx));
        conn
    }

    pub fn key(&self) -> &ConnKey {
        &self.key
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        *self.state_tx.borrow()
    }

    /// Watch for lifecycle changes (e.g. to render "reconnecting" in a UI)
    pub fn state_watch(&self) -> watch::Receiver<LinkState> {
        self.state_tx.subscribe()
    }

    /// Current reconnection phase
    pub fn reconnect_phase(&self) -> ReconnectPhase {
        self.reconnect.lock().phase()
    }

    pub fn metrics(&self) -> LinkMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// A connection is reusable by the pool until it reaches Closing/Closed
    pub fn is_live(&self) -> bool {
        !matches!(self.state(), LinkState::Closing | LinkState::Closed)
    }

    /// Frames queued for replay on the next open
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    /// Serialize and send a frame, queuing it FIFO while the link is not open
    pub fn send_frame(&self, frame: &ClientFrame) -> SyncResult<()> {
        self.send_text(frame.to_json()?)
    }

    /// Send raw frame text: transmit immediately if open, otherwise append to
    /// the outbound queue for replay on open
    pub fn send_text(&self, text: String) -> SyncResult<()> {
        match self.state() {
            LinkState::Open => self
                .cmd_tx
                .send(ConnCommand::Send(text))
                .map_err(|_| SyncError::ConnectionClosed),
            LinkState::Closing | LinkState::Closed => Err(SyncError::ConnectionClosed),
            _ => {
                self.pending.lock().push_back(text);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Register a callback for every topic-scoped inbound frame
    pub fn on_frame(
        &self,
        callback: impl Fn(&ServerFrame) + Send + Sync + 'static,
    ) -> ListenerHandle<ServerFrame> {
        self.frame_listeners.add(callback)
    }

    /// Register a callback for update frames of one kind only
    pub fn on_update_kind(
        &self,
        kind: impl Into<String>,
        callback: impl Fn(&UpdateFrame) + Send + Sync + 'static,
    ) -> ListenerHandle<ServerFrame> {
        let kind = kind.into();
        self.frame_listeners.add(move |frame| {
            if let ServerFrame::Update(update) = frame {
                if update.kind == kind {
                    callback(update);
                }
            }
        })
    }

    /// Register a hook producing frames to transmit first on every (re)open,
    /// ahead of the queued outbound frames. Used by the subscription manager
    /// to re-establish topic subscriptions after a drop.
    pub fn on_reopen(
        self: &Arc<Self>,
        hook: impl Fn() -> Vec<ClientFrame> + Send + Sync + 'static,
    ) -> ReopenHandle {
        let id = self.next_hook_id.fetch_add(1, Ordering::SeqCst);
        self.reopen_hooks.lock().insert(id, Arc::new(hook));
        ReopenHandle {
            conn: Arc::downgrade(self),
            id,
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Signal the driver to close cleanly. Keepalive and reconnect timers
    /// stop with the driver's select loop; the state watch reaches Closed
    /// once the close frame is on the wire.
    pub(crate) fn disconnect(&self) {
        self.state_tx.send_replace(LinkState::Closing);
        self.shutdown_tx.send_replace(true);
        let _ = self.cmd_tx.send(ConnCommand::Close);
    }

    /// Wait until the transport reports open, bounded by `timeout`
    pub async fn wait_open(&self, timeout: Duration) -> SyncResult<()> {
        let mut rx = self.state_tx.subscribe();
        let wait = async {
            loop {
                let state = *rx.borrow_and_update();
                match state {
                    LinkState::Open => return Ok(()),
                    LinkState::Closing | LinkState::Closed => {
                        return Err(match self.reconnect_phase() {
                            ReconnectPhase::Exhausted => SyncError::ReconnectExhausted {
                                attempts: self.reconnect.lock().max_attempts(),
                            },
                            _ => SyncError::ConnectionClosed,
                        });
                    }
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    return Err(SyncError::ConnectionClosed);
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::AcquireTimeout {
                seconds: timeout.as_secs(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Driver-side helpers
    // ------------------------------------------------------------------

    // send_replace, not send: a plain send drops the value when no receiver
    // is subscribed, and the only long-lived receivers are transient
    // (wait_open, UI watches). state() must stay truthful regardless.
    fn set_state(&self, state: LinkState) {
        self.state_tx.send_replace(state);
    }

    fn collect_reopen_frames(&self) -> Vec<ClientFrame> {
        let hooks: Vec<ReopenHook> = self.reopen_hooks.lock().values().cloned().collect();
        let mut frames = Vec::new();
        for hook in hooks {
            frames.extend(hook());
        }
        frames
    }

    fn pop_pending(&self) -> Option<String> {
        self.pending.lock().pop_front()
    }

    fn remove_reopen_hook(&self, id: u64) {
        self.reopen_hooks.lock().remove(&id);
    }
}

/// Deregistration handle for a reopen hook
pub struct ReopenHandle {
    conn: std::sync::Weak<Connection>,
    id: u64,
}

impl Drop for ReopenHandle {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.upgrade() {
            conn.remove_reopen_hook(self.id);
        }
    }
}

// ============================================================================
// DRIVER TASK
// ============================================================================

async fn drive(conn: Arc<Connection>, mut cmd_rx: mpsc::UnboundedReceiver<ConnCommand>) {
    let mut shutdown_rx = conn.shutdown_tx.subscribe();
    let mut first_attempt = true;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        if !first_attempt {
            conn.metrics.reconnect_started();
        }
        conn.set_state(LinkState::Connecting);

        let close = match connect_async(conn.url.as_str()).await {
            Ok((stream, _)) => {
                conn.reconnect.lock().record_open();
                logger::info(
                    LogTag::Link,
                    &format!("Connection {} open", conn.key()),
                );
                run_open_link(&conn, stream, &mut cmd_rx, &mut shutdown_rx).await
            }
            Err(e) => {
                logger::warning(
                    LogTag::Link,
                    &format!("Connection {} failed to open: {}", conn.key(), e),
                );
                CloseKind::Unclean
            }
        };
        first_attempt = false;

        match close {
            CloseKind::Clean => break,
            CloseKind::Unclean => {
                let (delay, attempt, max_attempts) = {
                    let mut policy = conn.reconnect.lock();
                    (policy.next_delay(), policy.attempts(), policy.max_attempts())
                };
                match delay {
                    Some(delay) => {
                        // The link is already gone; report it for the whole
                        // backoff window so send_text queues instead of
                        // feeding the dead command channel
                        conn.set_state(LinkState::Connecting);
                        logger::info(
                            LogTag::Link,
                            &format!(
                                "Connection {} dropped, reconnecting in {:.1}s (attempt {}/{})",
                                conn.key(),
                                delay.as_secs_f64(),
                                attempt,
                                max_attempts,
                            ),
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = wait_for_shutdown(&mut shutdown_rx) => break,
                        }
                    }
                    None => {
                        logger::error(
                            LogTag::Link,
                            &format!(
                                "Connection {} reconnect attempts exhausted, staying down until re-acquired",
                                conn.key()
                            ),
                        );
                        break;
                    }
                }
            }
        }
    }

    conn.set_state(LinkState::Closed);
    logger::info(
        LogTag::Link,
        &format!("Connection {} closed ({})", conn.key(), conn.metrics()),
    );
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn run_open_link(
    conn: &Arc<Connection>,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    cmd_rx: &mut mpsc::UnboundedReceiver<ConnCommand>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> CloseKind {
    let (mut sink, mut source) = stream.split();

    let mut keepalive = KeepaliveDriver::new(KeepaliveConfig {
        interval: Duration::from_secs(conn.cfg.keepalive_interval_secs),
        pong_timeout: Duration::from_secs(conn.cfg.pong_timeout_secs),
    });
    let mut dedup = FrameDedup::new(Duration::from_millis(conn.cfg.wire_dedup_ttl_ms));

    conn.set_state(LinkState::Open);

    // Re-subscribes from reopen hooks go out before any queued frames
    for frame in conn.collect_reopen_frames() {
        match frame.to_json() {
            Ok(text) => {
                if send_text(conn, &mut sink, text).await.is_err() {
                    return CloseKind::Unclean;
                }
            }
            Err(e) => {
                logger::error(
                    LogTag::Link,
                    &format!("Failed to serialize reopen frame: {}", e),
                );
            }
        }
    }

    // Replay the outbound queue in FIFO order
    let queued = conn.pending_count();
    if queued > 0 && is_debug_realtime_enabled() {
        logger::debug(
            LogTag::Link,
            &format!("Connection {}: replaying {} queued frame(s)", conn.key(), queued),
        );
    }
    while let Some(text) = conn.pop_pending() {
        if send_text(conn, &mut sink, text).await.is_err() {
            return CloseKind::Unclean;
        }
    }

    let mut tick = tokio::time::interval(keepalive.tick_period());

    loop {
        tokio::select! {
            _ = wait_for_shutdown(shutdown_rx) => {
                send_close(&mut sink).await;
                return CloseKind::Clean;
            }

            cmd = cmd_rx.recv() => match cmd {
                Some(ConnCommand::Send(text)) => {
                    if send_text(conn, &mut sink, text).await.is_err() {
                        return CloseKind::Unclean;
                    }
                }
                Some(ConnCommand::Close) | None => {
                    send_close(&mut sink).await;
                    return CloseKind::Clean;
                }
            },

            _ = tick.tick() => {
                if keepalive.is_pong_overdue() {
                    logger::warning(
                        LogTag::Keepalive,
                        &format!("Connection {}: probe unanswered, dropping link", conn.key()),
                    );
                    return CloseKind::Unclean;
                }
                if keepalive.should_ping() {
                    match ClientFrame::Ping.to_json() {
                        Ok(text) => {
                            if send_text(conn, &mut sink, text).await.is_err() {
                                return CloseKind::Unclean;
                            }
                            keepalive.record_ping();
                        }
                        Err(e) => {
                            logger::error(LogTag::Keepalive, &format!("Ping serialization failed: {}", e));
                        }
                    }
                }
            }

            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    conn.metrics.frame_received();
                    keepalive.record_activity();
                    if handle_text(conn, &text, &mut sink, &mut keepalive, &mut dedup)
                        .await
                        .is_err()
                    {
                        return CloseKind::Unclean;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    keepalive.record_activity();
                    if sink.send(Message::Pong(payload)).await.is_err() {
                        return CloseKind::Unclean;
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    keepalive.record_pong();
                }
                Some(Ok(Message::Close(_))) => {
                    // Server-side close: recover through the reconnect policy
                    return CloseKind::Unclean;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    logger::warning(
                        LogTag::Link,
                        &format!("Connection {} transport error: {}", conn.key(), e),
                    );
                    return CloseKind::Unclean;
                }
                None => return CloseKind::Unclean,
            }
        }
    }
}

/// Classify one inbound text frame and dispatch it
///
/// Malformed frames are logged and dropped, never propagated; a transport
/// error while answering a probe is the only failure path.
async fn handle_text(
    conn: &Arc<Connection>,
    text: &str,
    sink: &mut WsSink,
    keepalive: &mut KeepaliveDriver,
    dedup: &mut FrameDedup,
) -> Result<(), ()> {
    let parsed = match parse_frame(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            conn.metrics.malformed_dropped();
            logger::warning(
                LogTag::Link,
                &format!("Connection {}: dropping malformed frame: {}", conn.key(), e),
            );
            return Ok(());
        }
    };

    if let Some(msg_id) = &parsed.msg_id {
        if dedup.check_and_record(msg_id) {
            conn.metrics.duplicate_dropped();
            if is_debug_realtime_enabled() {
                logger::debug(
                    LogTag::Link,
                    &format!("Connection {}: duplicate frame {} dropped", conn.key(), msg_id),
                );
            }
            return Ok(());
        }
    }

    match parsed.frame {
        // Reply immediately so an echo-based heartbeat at the far end never
        // sees this client as idle
        ServerFrame::Ping => match ClientFrame::Pong.to_json() {
            Ok(text) => {
                send_text(conn, sink, text).await?;
            }
            Err(e) => {
                logger::error(LogTag::Keepalive, &format!("Pong serialization failed: {}", e));
            }
        },
        ServerFrame::Pong => keepalive.record_pong(),
        ServerFrame::Control { kind } => {
            if is_debug_realtime_enabled() {
                logger::debug(
                    LogTag::Link,
                    &format!("Connection {}: control frame '{}' ignored", conn.key(), kind),
                );
            }
        }
        frame @ (ServerFrame::Update(_) | ServerFrame::Truncate { .. }) => {
            conn.frame_listeners.emit(&frame);
        }
    }

    Ok(())
}

async fn send_text(conn: &Arc<Connection>, sink: &mut WsSink, text: String) -> Result<(), ()> {
    match sink.send(Message::Text(text)).await {
        Ok(()) => {
            conn.metrics.frame_sent();
            Ok(())
        }
        Err(e) => {
            logger::warning(
                LogTag::Link,
                &format!("Connection {} send failed: {}", conn.key(), e),
            );
            Err(())
        }
    }
}

async fn send_close(sink: &mut WsSink) {
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnect".into(),
        })))
        .await;
    let _ = sink.flush().await;
}
