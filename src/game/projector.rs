//! Streaming Projector
//!
//! Renders the externally visible state of a game. Pure: the move path, the
//! state-fetch path and push subscribers all go through [`render`], so they
//! agree exactly for the same underlying session.

use serde::{Serialize, Deserialize};

use crate::game::board::Cell;
use crate::game::state::{GameSession, GameStatus, Identity};

/// Visible snapshot of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStreamData {
    /// Rows top to bottom, each cell empty (`null`) or an identity.
    pub board: Vec<Vec<Cell>>,
    /// Player to move. Present only while the game is in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<Identity>,
    /// Winner. Present only when the game finished with a completed line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Identity>,
}

/// Project `session` into its visible snapshot.
pub fn render(session: &GameSession) -> GameStreamData {
    let width = session.board().width();
    let board = session
        .board()
        .snapshot()
        .chunks(width)
        .map(<[Cell]>::to_vec)
        .collect();

    let turn = match session.status() {
        GameStatus::InProgress => session.turn().cloned(),
        _ => None,
    };

    let winner = match session.status() {
        GameStatus::Finished => session.winner().cloned(),
        _ => None,
    };

    GameStreamData { board, turn, winner }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{GameConfig, GameId};

    fn session() -> GameSession {
        GameSession::new(GameId(1), GameConfig::new(3, 2, 2), Identity::from("A"))
    }

    #[test]
    fn test_waiting_game_has_no_turn_or_winner() {
        let data = render(&session());
        assert_eq!(data.board, vec![vec![None; 3]; 2]);
        assert_eq!(data.turn, None);
        assert_eq!(data.winner, None);
    }

    #[test]
    fn test_in_progress_has_turn() {
        let mut session = session();
        session.join(Identity::from("B")).unwrap();
        let data = render(&session);
        assert_eq!(data.turn, Some(Identity::from("A")));
        assert_eq!(data.winner, None);
    }

    #[test]
    fn test_finished_has_winner_and_no_turn() {
        let mut session = session();
        session.join(Identity::from("B")).unwrap();
        session.finish(Some(Identity::from("B")));

        let data = render(&session);
        assert_eq!(data.turn, None);
        assert_eq!(data.winner, Some(Identity::from("B")));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut session = session();
        session.join(Identity::from("B")).unwrap();
        assert_eq!(render(&session), render(&session));
    }

    #[test]
    fn test_board_rows_follow_layout() {
        let mut session = session();
        session.board_mut().set(1, 2, Some(Identity::from("A")));
        let data = render(&session);
        assert_eq!(data.board[1][2], Some(Identity::from("A")));
        assert_eq!(data.board[0], vec![None, None, None]);
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let json = serde_json::to_value(render(&session())).unwrap();
        assert!(json.get("turn").is_none());
        assert!(json.get("winner").is_none());
        assert_eq!(json["board"][0][0], serde_json::Value::Null);

        let mut session = session();
        session.join(Identity::from("B")).unwrap();
        let json = serde_json::to_value(render(&session)).unwrap();
        assert_eq!(json["turn"], "A");
    }
}
