//! Game Registry
//!
//! Owns every game from creation onwards. Each game sits in its own slot:
//! a mutex serializing joins and moves, and a watch channel holding the last
//! committed snapshot. Reads and subscribers only ever touch the snapshot, so
//! they never wait behind a move in progress.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::game::engine::{EngineConfig, MoveEngine, MoveRequest};
use crate::game::error::GameError;
use crate::game::projector::{render, GameStreamData};
use crate::game::state::{GameConfig, GameId, GameSession, GameStatus, GameSummary, Identity};

/// Receiver of committed snapshots for one game.
pub type SessionWatch = watch::Receiver<Arc<GameSession>>;

/// One registered game.
struct SessionSlot {
    /// Live session. Held for the whole of a join or move.
    state: Mutex<GameSession>,
    /// Last committed snapshot.
    published: watch::Sender<Arc<GameSession>>,
}

impl SessionSlot {
    fn new(session: GameSession) -> Self {
        let (published, _) = watch::channel(Arc::new(session.clone()));
        Self {
            state: Mutex::new(session),
            published,
        }
    }

    fn snapshot(&self) -> Arc<GameSession> {
        self.published.borrow().clone()
    }

    /// Must be called with `state` locked, after a mutation completed.
    fn publish(&self, session: &GameSession) -> Arc<GameSession> {
        let snapshot = Arc::new(session.clone());
        self.published.send_replace(snapshot.clone());
        snapshot
    }
}

/// All games known to this server.
///
/// Games are never removed; a finished game stays readable.
pub struct SessionRegistry {
    /// Slots by id. Held only for lookups and inserts.
    sessions: RwLock<BTreeMap<GameId, Arc<SessionSlot>>>,
    /// Next id to hand out.
    next_id: AtomicU64,
    /// Rules applied to every move.
    engine: MoveEngine,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            engine: MoveEngine::new(config),
        }
    }

    /// Engine settings in effect.
    pub fn engine_config(&self) -> &EngineConfig {
        self.engine.config()
    }

    async fn slot(&self, id: GameId) -> Result<Arc<SessionSlot>, GameError> {
        let sessions = self.sessions.read().await;
        sessions.get(&id).cloned().ok_or(GameError::NotFound(id))
    }

    /// Create a game hosted by `host`.
    #[instrument(skip(self, host), fields(host = %host))]
    pub async fn create(&self, config: GameConfig, host: Identity) -> Result<GameId, GameError> {
        self.engine.validate_config(&config)?;

        // Allocate under the write lock so id order matches insertion order.
        let mut sessions = self.sessions.write().await;
        let id = GameId(self.next_id.fetch_add(1, Ordering::Relaxed));
        sessions.insert(id, Arc::new(SessionSlot::new(GameSession::new(id, config, host))));
        drop(sessions);

        info!(
            game_id = %id,
            width = config.width,
            height = config.height,
            line_target = config.line_target,
            "Game created"
        );
        Ok(id)
    }

    /// Summaries of every game, in creation order.
    pub async fn list(&self) -> Vec<GameSummary> {
        self.collect(|_| true).await
    }

    /// Summaries of games still waiting for a second player.
    pub async fn list_open(&self) -> Vec<GameSummary> {
        self.collect(|session| session.status() == GameStatus::WaitingForPlayer).await
    }

    async fn collect(&self, keep: impl Fn(&GameSession) -> bool) -> Vec<GameSummary> {
        let slots: Vec<Arc<SessionSlot>> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        slots
            .iter()
            .map(|slot| slot.snapshot())
            .filter(|session| keep(session.as_ref()))
            .map(|session| session.summary())
            .collect()
    }

    /// Last committed snapshot of a game.
    pub async fn get(&self, id: GameId) -> Result<Arc<GameSession>, GameError> {
        Ok(self.slot(id).await?.snapshot())
    }

    /// Visible state of a game.
    pub async fn state(&self, id: GameId) -> Result<GameStreamData, GameError> {
        let session = self.get(id).await?;
        Ok(render(&session))
    }

    /// Seat `caller` as the second player.
    #[instrument(skip(self, id, caller), fields(game_id = %id, caller = %caller))]
    pub async fn join(&self, id: GameId, caller: Identity) -> Result<Arc<GameSession>, GameError> {
        let slot = self.slot(id).await?;
        let mut session = slot.state.lock().await;

        session.join(caller)?;
        info!(host = %session.host(), "Game started");
        Ok(slot.publish(&session))
    }

    /// Validate and apply a move, returning the resulting visible state.
    #[instrument(skip(self, id, caller, request), fields(game_id = %id, caller = %caller))]
    pub async fn make_move(
        &self,
        id: GameId,
        caller: &Identity,
        request: &MoveRequest,
    ) -> Result<GameStreamData, GameError> {
        let slot = self.slot(id).await?;
        let mut session = slot.state.lock().await;

        if let Err(e) = self.engine.apply(&mut session, caller, request) {
            debug!(error = %e, row = %request.row, direction = %request.direction, "Move rejected");
            return Err(e);
        }

        let snapshot = slot.publish(&session);
        Ok(render(&snapshot))
    }

    /// Watch a game's committed snapshots. Only its players may subscribe.
    ///
    /// The receiver starts at the current snapshot.
    pub async fn subscribe(&self, id: GameId, caller: &Identity) -> Result<SessionWatch, GameError> {
        let slot = self.slot(id).await?;
        if !slot.snapshot().is_player(caller) {
            return Err(GameError::NotAPlayer(id));
        }

        debug!(game_id = %id, caller = %caller, "Subscribed");
        Ok(slot.published.subscribe())
    }

    /// Number of games ever created.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
