//! Game Session State
//!
//! Identities, game configuration and the per-game state machine.
//! Only the move engine mutates the board, turn and winner of a session.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::game::board::Board;
use crate::game::error::GameError;

// =============================================================================
// IDENTITIES
// =============================================================================

/// Opaque caller identity.
///
/// Compared for equality only; the engine never looks inside it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap a resolved caller name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Game identifier.
///
/// Allocated from an increasing counter, so id order is creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Lifecycle phase of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created, waiting for a second player to join.
    WaitingForPlayer,
    /// Both players present, moves accepted.
    InProgress,
    /// Won or drawn. Read-only from here on.
    Finished,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameStatus::WaitingForPlayer => "waiting_for_player",
            GameStatus::InProgress => "in_progress",
            GameStatus::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Board dimensions and line length, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Columns per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Contiguous cells needed to win.
    pub line_target: usize,
}

impl GameConfig {
    /// Create a configuration. Not validated until [`GameConfig::validate`].
    pub const fn new(width: usize, height: usize, line_target: usize) -> Self {
        Self { width, height, line_target }
    }

    /// Check that the game is playable and within `max_dimension`.
    pub fn validate(&self, max_dimension: usize) -> Result<(), GameError> {
        if self.width == 0 || self.height == 0 {
            return Err(GameError::InvalidConfiguration(format!(
                "board must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }

        if self.width > max_dimension || self.height > max_dimension {
            return Err(GameError::InvalidConfiguration(format!(
                "board dimensions may not exceed {}, got {}x{}",
                max_dimension, self.width, self.height
            )));
        }

        if self.line_target < 2 {
            return Err(GameError::InvalidConfiguration(format!(
                "line_target must be at least 2, got {}",
                self.line_target
            )));
        }

        let longest = self.width.max(self.height);
        if self.line_target > longest {
            return Err(GameError::InvalidConfiguration(format!(
                "line_target {} cannot fit on a {}x{} board",
                self.line_target, self.width, self.height
            )));
        }

        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new(crate::DEFAULT_WIDTH, crate::DEFAULT_HEIGHT, crate::DEFAULT_LINE_TARGET)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Listing entry for a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Game identifier.
    pub game_id: GameId,
    /// Columns per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Contiguous cells needed to win.
    pub line_target: usize,
    /// Creator of the game.
    pub host: Identity,
    /// Second player, once joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemy: Option<Identity>,
    /// Current lifecycle phase.
    pub status: GameStatus,
}

/// One game from creation to finish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSession {
    id: GameId,
    config: GameConfig,
    host: Identity,
    enemy: Option<Identity>,
    status: GameStatus,
    board: Board,
    turn: Option<Identity>,
    winner: Option<Identity>,
    moves_played: u32,
}

impl GameSession {
    /// Create a session waiting for its second player.
    ///
    /// `config` must already be validated.
    pub fn new(id: GameId, config: GameConfig, host: Identity) -> Self {
        Self {
            id,
            config,
            host,
            enemy: None,
            status: GameStatus::WaitingForPlayer,
            board: Board::new(config.width, config.height),
            turn: None,
            winner: None,
            moves_played: 0,
        }
    }

    /// Game identifier.
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Dimensions and line length.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Creator of the game.
    pub fn host(&self) -> &Identity {
        &self.host
    }

    /// Second player, once joined.
    pub fn enemy(&self) -> Option<&Identity> {
        self.enemy.as_ref()
    }

    /// Current lifecycle phase.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Live board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Player to move. Only set while in progress.
    pub fn turn(&self) -> Option<&Identity> {
        self.turn.as_ref()
    }

    /// Winner of a finished game. `None` on a draw.
    pub fn winner(&self) -> Option<&Identity> {
        self.winner.as_ref()
    }

    /// Number of accepted moves.
    pub fn moves_played(&self) -> u32 {
        self.moves_played
    }

    /// Is `identity` the host or the enemy.
    pub fn is_player(&self, identity: &Identity) -> bool {
        &self.host == identity || self.enemy.as_ref() == Some(identity)
    }

    /// The other player, if `identity` is one of the two.
    pub fn opponent_of(&self, identity: &Identity) -> Option<&Identity> {
        if &self.host == identity {
            self.enemy.as_ref()
        } else if self.enemy.as_ref() == Some(identity) {
            Some(&self.host)
        } else {
            None
        }
    }

    /// Listing entry for this game.
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_id: self.id,
            width: self.config.width,
            height: self.config.height,
            line_target: self.config.line_target,
            host: self.host.clone(),
            enemy: self.enemy.clone(),
            status: self.status,
        }
    }

    /// Seat `caller` as the enemy and start the game with the host to move.
    pub fn join(&mut self, caller: Identity) -> Result<(), GameError> {
        if self.status != GameStatus::WaitingForPlayer {
            return Err(GameError::Conflict(format!(
                "game {} is already {}",
                self.id, self.status
            )));
        }

        if caller == self.host {
            return Err(GameError::Conflict(format!(
                "{} cannot join their own game",
                caller
            )));
        }

        self.enemy = Some(caller);
        self.turn = Some(self.host.clone());
        self.status = GameStatus::InProgress;
        self.check_invariants();
        Ok(())
    }

    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub(crate) fn record_move(&mut self) {
        self.moves_played += 1;
    }

    /// Hand the turn to the other player and return them.
    pub(crate) fn pass_turn(&mut self) -> Identity {
        let next = match self.turn.as_ref().and_then(|current| self.opponent_of(current)) {
            Some(next) => next.clone(),
            None => panic!("turn passed in game {} without two players", self.id),
        };
        self.turn = Some(next.clone());
        next
    }

    /// End the game. `winner` is `None` for a draw.
    pub(crate) fn finish(&mut self, winner: Option<Identity>) {
        self.status = GameStatus::Finished;
        self.turn = None;
        self.winner = winner;
    }

    /// Abort on engine bugs. None of these can be caused by caller input.
    pub(crate) fn check_invariants(&self) {
        assert_eq!(
            (self.board.width(), self.board.height()),
            (self.config.width, self.config.height),
            "board of game {} does not match its configuration",
            self.id
        );
        assert!(
            self.enemy.as_ref() != Some(&self.host),
            "game {} has the host seated twice",
            self.id
        );
        match self.status {
            GameStatus::WaitingForPlayer => {
                assert!(self.enemy.is_none() && self.turn.is_none() && self.winner.is_none());
            }
            GameStatus::InProgress => {
                assert!(self.enemy.is_some() && self.winner.is_none());
                assert!(self.turn.as_ref().is_some_and(|t| self.is_player(t)));
            }
            GameStatus::Finished => {
                assert!(self.turn.is_none());
                assert!(self.winner.as_ref().map_or(true, |w| self.is_player(w)));
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        GameSession::new(GameId(1), GameConfig::new(4, 4, 3), Identity::from("A"))
    }

    #[test]
    fn test_config_validation() {
        assert!(GameConfig::new(4, 4, 3).validate(64).is_ok());
        assert!(GameConfig::new(1, 5, 5).validate(64).is_ok());
        assert!(GameConfig::new(7, 2, 7).validate(64).is_ok());

        for bad in [
            GameConfig::new(0, 4, 2),
            GameConfig::new(4, 0, 2),
            GameConfig::new(4, 4, 1),
            GameConfig::new(4, 4, 5),
            GameConfig::new(65, 4, 3),
        ] {
            assert!(
                matches!(bad.validate(64), Err(GameError::InvalidConfiguration(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_default_config_matches_schema_defaults() {
        let config = GameConfig::default();
        assert_eq!((config.width, config.height, config.line_target), (7, 7, 4));
        assert!(config.validate(64).is_ok());
    }

    #[test]
    fn test_new_session_waits_for_player() {
        let session = session();
        assert_eq!(session.status(), GameStatus::WaitingForPlayer);
        assert_eq!(session.host(), &Identity::from("A"));
        assert!(session.enemy().is_none());
        assert!(session.turn().is_none());
        assert!(session.winner().is_none());
        session.check_invariants();
    }

    #[test]
    fn test_join_starts_game_with_host_to_move() {
        let mut session = session();
        session.join(Identity::from("B")).unwrap();

        assert_eq!(session.status(), GameStatus::InProgress);
        assert_eq!(session.enemy(), Some(&Identity::from("B")));
        assert_eq!(session.turn(), Some(&Identity::from("A")));
    }

    #[test]
    fn test_self_join_rejected() {
        let mut session = session();
        let result = session.join(Identity::from("A"));

        assert!(matches!(result, Err(GameError::Conflict(_))));
        assert_eq!(session.status(), GameStatus::WaitingForPlayer);
        assert!(session.enemy().is_none());
    }

    #[test]
    fn test_double_join_rejected() {
        let mut session = session();
        session.join(Identity::from("B")).unwrap();

        let result = session.join(Identity::from("C"));
        assert!(matches!(result, Err(GameError::Conflict(_))));
        assert_eq!(session.enemy(), Some(&Identity::from("B")));
        assert_eq!(session.status(), GameStatus::InProgress);
    }

    #[test]
    fn test_pass_turn_alternates() {
        let mut session = session();
        session.join(Identity::from("B")).unwrap();

        session.pass_turn();
        assert_eq!(session.turn(), Some(&Identity::from("B")));
        session.pass_turn();
        assert_eq!(session.turn(), Some(&Identity::from("A")));
    }

    #[test]
    fn test_opponent_lookup() {
        let mut session = session();
        assert_eq!(session.opponent_of(&Identity::from("A")), None);

        session.join(Identity::from("B")).unwrap();
        assert_eq!(session.opponent_of(&Identity::from("A")), Some(&Identity::from("B")));
        assert_eq!(session.opponent_of(&Identity::from("B")), Some(&Identity::from("A")));
        assert_eq!(session.opponent_of(&Identity::from("C")), None);
        assert!(!session.is_player(&Identity::from("C")));
    }

    #[test]
    fn test_summary_round_trip_fields() {
        let session = session();
        let summary = session.summary();
        assert_eq!(summary.game_id, GameId(1));
        assert_eq!((summary.width, summary.height, summary.line_target), (4, 4, 3));
        assert_eq!(summary.host, Identity::from("A"));
        assert_eq!(summary.enemy, None);
    }

    #[test]
    fn test_summary_json_shape() {
        let json = serde_json::to_value(session().summary()).unwrap();
        assert_eq!(json["game_id"], 1);
        assert_eq!(json["host"], "A");
        assert_eq!(json["status"], "waiting_for_player");
        assert!(json.get("enemy").is_none());
    }

    #[test]
    #[should_panic(expected = "does not match its configuration")]
    fn test_mismatched_board_panics() {
        let mut session = session();
        session.board = Board::new(3, 4);
        session.check_invariants();
    }
}
