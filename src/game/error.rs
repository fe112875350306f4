//! Game Errors
//!
//! Every variant is recoverable by the caller: requests are validated in
//! full before any state changes, so a rejected request leaves the game
//! untouched.

use crate::game::state::{GameId, GameStatus};

/// Rejection of a game request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Creation parameters describe an unplayable or oversized board.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No game with this id.
    #[error("game {0} not found")]
    NotFound(GameId),

    /// Join onto a started game or onto one's own game.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Move before the second player joined or after the game finished.
    #[error("game is not in progress ({0})")]
    GameNotInProgress(GameStatus),

    /// Move submitted by the player who is not on turn.
    #[error("not your turn")]
    NotYourTurn,

    /// Row out of range or unknown direction.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// Caller is neither the host nor the enemy of the game.
    #[error("not a player in game {0}")]
    NotAPlayer(GameId),
}
