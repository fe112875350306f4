//! Row Shift Policies
//!
//! A move pushes the mover's marker into one end of a row. The policy decides
//! what happens to the cells already in the row. Everything else in the
//! engine is independent of which policy is active.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::game::board::Cell;
use crate::game::state::Identity;

/// Direction the row moves in.
///
/// `Right` inserts at column 0 and pushes toward the last column.
/// `Left` inserts at the last column and pushes toward column 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Push toward column 0.
    Left,
    /// Push toward the last column.
    Right,
}

impl Direction {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown direction literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction {0:?}, expected \"left\" or \"right\"")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// How a row reacts to an inserted marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftPolicy {
    /// Every cell moves one step; the far-edge cell falls off.
    #[default]
    Conveyor,
    /// Cells move only up to the nearest gap; nothing falls off until the row is full.
    Growth,
}

impl ShiftPolicy {
    /// Insert `marker` at the near edge of `row`, shifting toward `direction`.
    ///
    /// Returns the cell that fell off the far edge. Its content is `None`
    /// both when nothing fell off and when an empty cell did.
    pub fn apply(self, row: &mut [Cell], direction: Direction, marker: &Identity) -> Cell {
        if row.is_empty() {
            return None;
        }

        match self {
            ShiftPolicy::Conveyor => conveyor(row, direction, marker),
            ShiftPolicy::Growth => growth(row, direction, marker),
        }
    }

    /// Config name.
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftPolicy::Conveyor => "conveyor",
            ShiftPolicy::Growth => "growth",
        }
    }
}

impl fmt::Display for ShiftPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conveyor" => Ok(ShiftPolicy::Conveyor),
            "growth" => Ok(ShiftPolicy::Growth),
            other => Err(format!("unknown shift policy {:?}", other)),
        }
    }
}

fn conveyor(row: &mut [Cell], direction: Direction, marker: &Identity) -> Cell {
    match direction {
        Direction::Right => {
            row.rotate_right(1);
            std::mem::replace(&mut row[0], Some(marker.clone()))
        }
        Direction::Left => {
            row.rotate_left(1);
            let last = row.len() - 1;
            std::mem::replace(&mut row[last], Some(marker.clone()))
        }
    }
}

fn growth(row: &mut [Cell], direction: Direction, marker: &Identity) -> Cell {
    match direction {
        Direction::Right => match row.iter().position(Option::is_none) {
            Some(gap) => {
                row[..=gap].rotate_right(1);
                row[0] = Some(marker.clone());
                None
            }
            None => conveyor(row, direction, marker),
        },
        Direction::Left => match row.iter().rposition(Option::is_none) {
            Some(gap) => {
                row[gap..].rotate_left(1);
                let last = row.len() - 1;
                row[last] = Some(marker.clone());
                None
            }
            None => conveyor(row, direction, marker),
        },
    }
}
