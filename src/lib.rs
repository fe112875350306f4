//! # Rowshift Game Server
//!
//! Authoritative server for two-player row-shift connection games.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ROWSHIFT SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Game rules (pure, synchronous)            │
//! │  ├── board.rs    - Grid of cells                             │
//! │  ├── shift.rs    - Row push policies                         │
//! │  ├── win.rs      - Line detection                            │
//! │  ├── state.rs    - Sessions and configuration                │
//! │  ├── engine.rs   - Move validation and application           │
//! │  └── projector.rs- Visible game snapshot                     │
//! │                                                              │
//! │  network/        - Networking (async)                        │
//! │  ├── registry.rs - Game registry and subscriptions           │
//! │  ├── auth.rs     - Caller identity resolution                │
//! │  ├── protocol.rs - Message types                             │
//! │  └── server.rs   - WebSocket server                          │
//! │                                                              │
//! │  config.rs       - Environment configuration                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! Every game is mutated under its own lock. A reader or subscriber only
//! ever sees a session between two complete moves, never halfway through one.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError};
pub use game::{GameConfig, GameError, GameId, GameStatus, GameStreamData, Identity, MoveRequest};
pub use network::{GameServer, SessionRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Board width used when a create request leaves it out.
pub const DEFAULT_WIDTH: usize = 7;

/// Board height used when a create request leaves it out.
pub const DEFAULT_HEIGHT: usize = 7;

/// Line length used when a create request leaves it out.
pub const DEFAULT_LINE_TARGET: usize = 4;

/// Largest board width or height accepted by default.
pub const DEFAULT_MAX_DIMENSION: usize = 64;
