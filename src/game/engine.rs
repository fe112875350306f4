//! Move Engine
//!
//! Validates a submitted move against a session and applies it. Validation
//! runs to completion before the board is touched, so a rejected move leaves
//! the session exactly as it was.

use serde::{Serialize, Deserialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::game::board::Cell;
use crate::game::error::GameError;
use crate::game::shift::{Direction, ShiftPolicy};
use crate::game::state::{GameConfig, GameSession, GameStatus, Identity};
use crate::game::win::{find_line, find_line_for, WinLine};

/// A validated move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMove {
    /// Target row, `0..height`.
    pub row: usize,
    /// Direction the row is pushed.
    pub direction: Direction,
}

impl PlayerMove {
    /// Create a move.
    pub const fn new(row: usize, direction: Direction) -> Self {
        Self { row, direction }
    }
}

/// A move as submitted by a caller, before validation.
///
/// Both fields are kept as raw JSON so a malformed move of any shape is
/// reported only after the game and turn checks have passed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Requested row.
    #[serde(default)]
    pub row: Value,
    /// Requested direction literal.
    #[serde(default)]
    pub direction: Value,
}

impl MoveRequest {
    /// Create a request from anything JSON-representable.
    pub fn new(row: impl Into<Value>, direction: impl Into<Value>) -> Self {
        Self {
            row: row.into(),
            direction: direction.into(),
        }
    }

    /// Check the row against `height` and parse the direction.
    pub fn validate(&self, height: usize) -> Result<PlayerMove, GameError> {
        let row = self
            .row
            .as_u64()
            .and_then(|row| usize::try_from(row).ok())
            .filter(|row| *row < height)
            .ok_or_else(|| {
                GameError::InvalidMove(format!("row {} out of range 0..{}", self.row, height))
            })?;

        let direction = match &self.direction {
            Value::String(literal) => literal
                .parse::<Direction>()
                .map_err(|e| GameError::InvalidMove(e.to_string()))?,
            other => {
                return Err(GameError::InvalidMove(format!(
                    "direction must be \"left\" or \"right\", got {}",
                    other
                )))
            }
        };

        Ok(PlayerMove { row, direction })
    }
}

impl From<PlayerMove> for MoveRequest {
    fn from(mv: PlayerMove) -> Self {
        Self::new(mv.row as u64, mv.direction.as_str())
    }
}

/// Engine settings shared by every game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Row shift behavior.
    pub shift_policy: ShiftPolicy,
    /// Largest accepted width or height.
    pub max_dimension: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shift_policy: ShiftPolicy::Conveyor,
            max_dimension: crate::DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Result of an accepted move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Game continues with `next_turn` to move.
    Continue {
        /// Player now on turn.
        next_turn: Identity,
        /// Cell pushed off the far edge.
        discarded: Cell,
    },
    /// A line was completed. The mover wins whoever owns the line.
    Won {
        /// The mover.
        winner: Identity,
        /// The completed line, the mover's own when there is one.
        line: WinLine,
    },
    /// Board filled without a line.
    Draw,
}

impl MoveOutcome {
    /// Did this move finish the game.
    pub fn is_final(&self) -> bool {
        !matches!(self, MoveOutcome::Continue { .. })
    }
}

/// Applies moves to sessions under one [`EngineConfig`].
#[derive(Clone, Debug, Default)]
pub struct MoveEngine {
    config: EngineConfig,
}

impl MoveEngine {
    /// Create an engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Active settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a game configuration against this engine's limits.
    pub fn validate_config(&self, config: &GameConfig) -> Result<(), GameError> {
        config.validate(self.config.max_dimension)
    }

    /// Validate and apply one move.
    ///
    /// # Arguments
    ///
    /// * `session` - The game (mutated only if the move is accepted)
    /// * `caller` - Resolved identity of the submitter
    /// * `request` - The submitted move
    ///
    /// # Errors
    ///
    /// Checked in order, first failure wins: [`GameError::GameNotInProgress`],
    /// [`GameError::NotYourTurn`], [`GameError::InvalidMove`].
    #[instrument(skip(self, session, caller, request), fields(game_id = %session.id(), caller = %caller))]
    pub fn apply(
        &self,
        session: &mut GameSession,
        caller: &Identity,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, GameError> {
        if session.status() != GameStatus::InProgress {
            return Err(GameError::GameNotInProgress(session.status()));
        }

        if session.turn() != Some(caller) {
            return Err(GameError::NotYourTurn);
        }

        let mv = request.validate(session.board().height())?;

        // Validation is complete; everything below is infallible.
        let discarded = session.board_mut().row_shift(
            mv.row,
            mv.direction,
            caller,
            self.config.shift_policy,
        );
        session.record_move();

        debug!(
            row = mv.row,
            direction = %mv.direction,
            discarded = ?discarded,
            move_number = session.moves_played(),
            "Move applied"
        );

        let line_target = session.config().line_target;
        let line = find_line_for(session.board(), line_target, caller)
            .or_else(|| find_line(session.board(), line_target));

        let outcome = if let Some(line) = line {
            info!(
                winner = %caller,
                line_owner = %line.owner,
                moves = session.moves_played(),
                "Game won"
            );
            session.finish(Some(caller.clone()));
            MoveOutcome::Won { winner: caller.clone(), line }
        } else if session.board().is_full() {
            info!(moves = session.moves_played(), "Game drawn");
            session.finish(None);
            MoveOutcome::Draw
        } else {
            let next_turn = session.pass_turn();
            MoveOutcome::Continue { next_turn, discarded }
        };

        session.check_invariants();
        Ok(outcome)
    }
}
