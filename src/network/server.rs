//! WebSocket Game Server
//!
//! Async WebSocket server in front of the [`SessionRegistry`].
//! Handles authentication, request routing and state subscriptions.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::game::engine::EngineConfig;
use crate::game::error::GameError;
use crate::game::projector::render;
use crate::game::state::{GameId, GameStatus, Identity};
use crate::network::auth::{resolve_identity, AuthConfig};
use crate::network::protocol::{
    AuthRequest, AuthResult, ClientMessage, ErrorCode, ServerError, ServerMessage,
};
use crate::network::registry::{SessionRegistry, SessionWatch};

/// Time allowed to flush queued replies when a connection closes.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// A connection with no frame in either direction for this long is closed.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            version: crate::VERSION.to_string(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// Why a request was refused.
#[derive(Debug)]
enum RequestError {
    /// Request needs an identity and none was resolved yet.
    NotAuthenticated,
    /// Rejected by the registry or engine.
    Game(GameError),
}

impl From<GameError> for RequestError {
    fn from(err: GameError) -> Self {
        RequestError::Game(err)
    }
}

impl From<RequestError> for ServerError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::NotAuthenticated => {
                ServerError::new(ErrorCode::NotAuthenticated, "Must authenticate first")
            }
            RequestError::Game(e) => ServerError::from(&e),
        }
    }
}

/// Connected client as seen by the server.
struct ConnectedClient {
    /// Identity after auth.
    identity: Option<Identity>,
    /// Connection time.
    connected_at: Instant,
}

/// State owned by one connection task.
struct Connection {
    addr: SocketAddr,
    identity: Option<Identity>,
    /// Forwarding task per watched game.
    subscriptions: BTreeMap<GameId, JoinHandle<()>>,
    sender: mpsc::Sender<ServerMessage>,
}

impl Connection {
    fn identity(&self) -> Result<&Identity, RequestError> {
        self.identity.as_ref().ok_or(RequestError::NotAuthenticated)
    }

    async fn send(&self, msg: ServerMessage) {
        let _ = self.sender.send(msg).await;
    }

    fn unsubscribe(&mut self, game_id: GameId) {
        if let Some(task) = self.subscriptions.remove(&game_id) {
            task.abort();
        }
    }

    fn unsubscribe_all(&mut self) {
        for (_, task) in std::mem::take(&mut self.subscriptions) {
            task.abort();
        }
    }
}

/// Shared by every connection task.
struct ServerContext {
    config: ServerConfig,
    auth: AuthConfig,
    registry: Arc<SessionRegistry>,
    clients: RwLock<BTreeMap<SocketAddr, ConnectedClient>>,
}

/// The game server.
pub struct GameServer {
    ctx: Arc<ServerContext>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server with an empty registry.
    pub fn new(config: ServerConfig, engine: EngineConfig, auth: AuthConfig) -> Self {
        Self::with_registry(config, Arc::new(SessionRegistry::new(engine)), auth)
    }

    /// Create a server in front of an existing registry.
    pub fn with_registry(
        config: ServerConfig,
        registry: Arc<SessionRegistry>,
        auth: AuthConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            ctx: Arc::new(ServerContext {
                config,
                auth,
                registry,
                clients: RwLock::new(BTreeMap::new()),
            }),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.ctx.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from `listener` until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!(
            addr = %listener.local_addr()?,
            auth = self.ctx.auth.is_configured(),
            shift_policy = %self.ctx.registry.engine_config().shift_policy,
            "Game server listening"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if !self.register(addr).await {
                                warn!("Connection limit reached, rejecting {}", addr);
                                tokio::spawn(reject_overloaded(stream, addr));
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reserve a connection slot for `addr`. False if the server is full.
    async fn register(&self, addr: SocketAddr) -> bool {
        let mut clients = self.ctx.clients.write().await;
        if clients.len() >= self.ctx.config.max_connections {
            return false;
        }

        clients.insert(addr, ConnectedClient {
            identity: None,
            connected_at: Instant::now(),
        });
        true
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let ctx = self.ctx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    ctx.clients.write().await.remove(&addr);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            // Ticks after every frame written, so pushes keep the connection alive.
            let (written_tx, mut written_rx) = watch::channel(());

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                    written_tx.send_replace(());
                }
                let _ = ws_sender.send(Message::Close(None)).await;
            });

            let mut conn = Connection {
                addr,
                identity: None,
                subscriptions: BTreeMap::new(),
                sender: msg_tx,
            };

            let idle_timeout = ctx.config.idle_timeout;
            let idle = tokio::time::sleep(idle_timeout);
            tokio::pin!(idle);

            loop {
                tokio::select! {
                    _ = &mut idle => {
                        info!("Closing idle connection {}", addr);
                        break;
                    }
                    Ok(()) = written_rx.changed() => {
                        idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);
                    }
                    msg = ws_receiver.next() => {
                        idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);

                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        conn.send(ServerMessage::Error(ServerError::new(
                                            ErrorCode::InvalidInput,
                                            format!("Invalid message format: {}", e),
                                        ))).await;
                                        continue;
                                    }
                                };

                                Self::handle_client_message(&ctx, &mut conn, client_msg).await;
                            }
                            Some(Ok(Message::Binary(_))) => {
                                conn.send(ServerMessage::Error(ServerError::new(
                                    ErrorCode::InvalidInput,
                                    "Binary frames are not supported",
                                ))).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        conn.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            conn.unsubscribe_all();
            drop(conn);
            if tokio::time::timeout(FLUSH_TIMEOUT, sender_task).await.is_err() {
                debug!("Gave up flushing replies to {}", addr);
            }

            if let Some(client) = ctx.clients.write().await.remove(&addr) {
                info!(
                    identity = ?client.identity.as_ref().map(Identity::as_str),
                    connected_secs = client.connected_at.elapsed().as_secs(),
                    "Client {} cleaned up",
                    addr
                );
            }
        });
    }

    /// Handle a client message and send its reply, if any.
    async fn handle_client_message(ctx: &ServerContext, conn: &mut Connection, msg: ClientMessage) {
        let reply = match Self::dispatch(ctx, conn, msg).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                debug!(addr = %conn.addr, error = ?e, "Request rejected");
                ServerMessage::Error(e.into())
            }
        };

        conn.send(reply).await;
    }

    async fn dispatch(
        ctx: &ServerContext,
        conn: &mut Connection,
        msg: ClientMessage,
    ) -> Result<Option<ServerMessage>, RequestError> {
        let registry = &ctx.registry;

        let reply = match msg {
            ClientMessage::Auth(auth) => Self::handle_auth(ctx, conn, auth).await,
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64,
            },
            ClientMessage::ListGames { open_only } => {
                conn.identity()?;
                let games = if open_only {
                    registry.list_open().await
                } else {
                    registry.list().await
                };
                ServerMessage::Games { games }
            }
            ClientMessage::CreateGame(req) => {
                let host = conn.identity()?.clone();
                let game_id = registry.create(req.into(), host).await?;
                ServerMessage::Game(registry.get(game_id).await?.summary())
            }
            ClientMessage::GetGame { game_id } => {
                conn.identity()?;
                ServerMessage::Game(registry.get(game_id).await?.summary())
            }
            ClientMessage::JoinGame { game_id } => {
                let caller = conn.identity()?.clone();
                ServerMessage::Game(registry.join(game_id, caller).await?.summary())
            }
            ClientMessage::MakeMove(req) => {
                let caller = conn.identity()?;
                let state = registry
                    .make_move(req.game_id, caller, &req.to_move_request())
                    .await?;
                ServerMessage::State { game_id: req.game_id, state }
            }
            ClientMessage::GetState { game_id } => {
                conn.identity()?;
                ServerMessage::State { game_id, state: registry.state(game_id).await? }
            }
            ClientMessage::Subscribe { game_id } => {
                let watch = registry.subscribe(game_id, conn.identity()?).await?;
                conn.unsubscribe(game_id);
                let task = tokio::spawn(forward_states(game_id, watch, conn.sender.clone()));
                conn.subscriptions.insert(game_id, task);
                // The forwarding task sends the current state first.
                return Ok(None);
            }
            ClientMessage::Unsubscribe { game_id } => {
                conn.identity()?;
                conn.unsubscribe(game_id);
                ServerMessage::Unsubscribed { game_id }
            }
        };

        Ok(Some(reply))
    }

    /// Handle authentication.
    async fn handle_auth(ctx: &ServerContext, conn: &mut Connection, auth: AuthRequest) -> ServerMessage {
        let identity = match resolve_identity(&auth.token, &ctx.auth) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(addr = %conn.addr, error = %e, "Authentication failed");
                return ServerMessage::AuthResult(AuthResult {
                    success: false,
                    identity: None,
                    error: Some(ServerError::from(&e)),
                    server_version: ctx.config.version.clone(),
                });
            }
        };

        // Subscriptions were granted to the previous identity.
        if conn.identity.as_ref() != Some(&identity) {
            conn.unsubscribe_all();
        }
        conn.identity = Some(identity.clone());

        if let Some(client) = ctx.clients.write().await.get_mut(&conn.addr) {
            client.identity = Some(identity.clone());
        }

        debug!(
            addr = %conn.addr,
            identity = %identity,
            client_version = auth.client_version.as_deref().unwrap_or("unknown"),
            "Client authenticated"
        );

        ServerMessage::AuthResult(AuthResult {
            success: true,
            identity: Some(identity),
            error: None,
            server_version: ctx.config.version.clone(),
        })
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// The registry behind this server.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.ctx.registry
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.ctx.clients.read().await.len()
    }

    /// Get game count.
    pub async fn session_count(&self) -> usize {
        self.ctx.registry.session_count().await
    }
}

/// Push a state message for every snapshot `watch` sees, starting with the
/// current one. Stops once the game is finished or the client is gone.
async fn forward_states(game_id: GameId, mut watch: SessionWatch, sender: mpsc::Sender<ServerMessage>) {
    loop {
        let (state, finished) = {
            let session = watch.borrow_and_update();
            (render(&session), session.status() == GameStatus::Finished)
        };

        if sender.send(ServerMessage::State { game_id, state }).await.is_err() || finished {
            return;
        }

        if watch.changed().await.is_err() {
            return;
        }
    }
}

/// Tell a client over the connection limit why it is being turned away.
async fn reject_overloaded(stream: TcpStream, addr: SocketAddr) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    let msg = ServerMessage::Error(ServerError::new(
        ErrorCode::ServerOverloaded,
        "Connection limit reached",
    ));
    if let Ok(text) = msg.to_json() {
        let _ = ws.send(Message::Text(text)).await;
    }
    let _ = ws.close(None).await;
    debug!("Rejected {}", addr);
}
