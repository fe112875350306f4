//! Network Layer
//!
//! Game registry and the WebSocket edge in front of it.
//! All rule decisions are delegated to `game/`.

pub mod auth;
pub mod protocol;
pub mod registry;
pub mod server;

pub use auth::{resolve_identity, validate_token, AuthConfig, AuthError, TokenClaims};
pub use protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};
pub use registry::{SessionRegistry, SessionWatch};
pub use server::{GameServer, GameServerError, ServerConfig};
