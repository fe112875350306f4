//! Game Logic Module
//!
//! Board model, row shifting, win detection and the per-game state machine.
//! Nothing here does I/O; the network layer owns concurrency.
//!
//! ## Module Structure
//!
//! - `board`: Fixed-size grid of owned or empty cells
//! - `shift`: Row push directions and shift policies
//! - `win`: Line detection over the whole board
//! - `state`: Identities, game configuration and sessions
//! - `engine`: Move validation and application
//! - `projector`: Visible snapshot of a game
//! - `error`: Error taxonomy shared by every game operation

pub mod board;
pub mod engine;
pub mod error;
pub mod projector;
pub mod shift;
pub mod state;
pub mod win;

// Re-export key types
pub use board::{Board, Cell};
pub use engine::{EngineConfig, MoveEngine, MoveOutcome, MoveRequest, PlayerMove};
pub use error::GameError;
pub use projector::{render, GameStreamData};
pub use shift::{Direction, ShiftPolicy};
pub use state::{GameConfig, GameId, GameSession, GameStatus, GameSummary, Identity};
pub use win::WinLine;
