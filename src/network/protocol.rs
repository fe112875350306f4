//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON text frame tagged by `type`.

use serde::{Serialize, Deserialize};

use crate::game::engine::MoveRequest;
use crate::game::error::GameError;
use crate::game::projector::GameStreamData;
use crate::game::state::{GameConfig, GameId, GameSummary, Identity};
use crate::network::auth::AuthError;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Resolve the caller identity for this connection.
    Auth(AuthRequest),

    /// List games.
    ListGames {
        /// Only games still waiting for a second player.
        #[serde(default)]
        open_only: bool,
    },

    /// Create a game hosted by the caller.
    CreateGame(CreateGameRequest),

    /// Fetch one game's summary.
    GetGame {
        /// Game to fetch.
        game_id: GameId,
    },

    /// Join a game as its second player.
    JoinGame {
        /// Game to join.
        game_id: GameId,
    },

    /// Submit a move.
    MakeMove(MakeMoveRequest),

    /// Fetch one game's visible state.
    GetState {
        /// Game to fetch.
        game_id: GameId,
    },

    /// Receive a state message after every committed change to a game.
    Subscribe {
        /// Game to watch.
        game_id: GameId,
    },

    /// Stop a subscription.
    Unsubscribe {
        /// Game to stop watching.
        game_id: GameId,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client clock, echoed back.
        timestamp: u64,
    },
}

/// Authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Bearer token. A JWT when the server has auth configured.
    pub token: String,
    /// Client version, logged only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
}

/// Create-game request. Omitted fields take the server defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    /// Columns per row.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Number of rows.
    #[serde(default = "default_height")]
    pub height: usize,
    /// Contiguous cells needed to win.
    #[serde(default = "default_line_target")]
    pub line_target: usize,
}

fn default_width() -> usize {
    crate::DEFAULT_WIDTH
}

fn default_height() -> usize {
    crate::DEFAULT_HEIGHT
}

fn default_line_target() -> usize {
    crate::DEFAULT_LINE_TARGET
}

impl Default for CreateGameRequest {
    fn default() -> Self {
        GameConfig::default().into()
    }
}

impl From<CreateGameRequest> for GameConfig {
    fn from(req: CreateGameRequest) -> Self {
        GameConfig::new(req.width, req.height, req.line_target)
    }
}

impl From<GameConfig> for CreateGameRequest {
    fn from(config: GameConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            line_target: config.line_target,
        }
    }
}

/// Move submission.
///
/// `row` and `direction` are taken as any JSON value, missing ones as null;
/// the engine checks type, range and spelling after the turn check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeMoveRequest {
    /// Target game.
    pub game_id: GameId,
    /// Row to push.
    #[serde(default)]
    pub row: serde_json::Value,
    /// `left` or `right`.
    #[serde(default)]
    pub direction: serde_json::Value,
}

impl MakeMoveRequest {
    /// The move part of the request.
    pub fn to_move_request(&self) -> MoveRequest {
        MoveRequest::new(self.row.clone(), self.direction.clone())
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Game listing.
    Games {
        /// Summaries in creation order.
        games: Vec<GameSummary>,
    },

    /// One game's summary. Reply to create, get and join.
    Game(GameSummary),

    /// One game's visible state. Reply to a move or state fetch, and pushed
    /// to subscribers.
    State {
        /// Game the state belongs to.
        game_id: GameId,
        /// Board, turn and winner.
        state: GameStreamData,
    },

    /// Subscription ended.
    Unsubscribed {
        /// Game no longer watched.
        game_id: GameId,
    },

    /// Pong response.
    Pong {
        /// Client timestamp from the ping.
        timestamp: u64,
        /// Server clock in Unix milliseconds.
        server_time: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Why.
        reason: String,
    },
}

/// Authentication result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Resolved identity if successful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Why it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServerError>,
    /// Server version.
    pub server_version: String,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Create an error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Game parameters rejected.
    InvalidConfiguration,
    /// No such game.
    NotFound,
    /// Join not possible in the game's current state.
    Conflict,
    /// Game has not started or is over.
    GameNotInProgress,
    /// Caller is not the player on turn.
    NotYourTurn,
    /// Row out of range or unknown direction.
    InvalidMove,
    /// Caller is neither host nor enemy.
    NotAPlayer,
    /// Request needs an identity; send `auth` first.
    NotAuthenticated,
    /// Authentication failed.
    AuthFailed,
    /// JWT token has expired.
    TokenExpired,
    /// Invalid JWT token (signature, format, claims).
    InvalidToken,
    /// Malformed message.
    InvalidInput,
    /// Connection limit reached.
    ServerOverloaded,
}

impl From<&GameError> for ErrorCode {
    fn from(err: &GameError) -> Self {
        match err {
            GameError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            GameError::NotFound(_) => ErrorCode::NotFound,
            GameError::Conflict(_) => ErrorCode::Conflict,
            GameError::GameNotInProgress(_) => ErrorCode::GameNotInProgress,
            GameError::NotYourTurn => ErrorCode::NotYourTurn,
            GameError::InvalidMove(_) => ErrorCode::InvalidMove,
            GameError::NotAPlayer(_) => ErrorCode::NotAPlayer,
        }
    }
}

impl From<&AuthError> for ErrorCode {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::Expired => ErrorCode::TokenExpired,
            AuthError::EmptyToken => ErrorCode::AuthFailed,
            _ => ErrorCode::InvalidToken,
        }
    }
}

impl From<&GameError> for ServerError {
    fn from(err: &GameError) -> Self {
        Self::new(err.into(), err.to_string())
    }
}

impl From<&AuthError> for ServerError {
    fn from(err: &AuthError) -> Self {
        Self::new(err.into(), err.to_string())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
