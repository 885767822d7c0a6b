use serde::{Deserialize, Serialize};

use crate::Tile;

/// Identifies a player for the duration of one game, in join order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {}", self.0)
    }
}

/// The color of a player's avatar. At most one player per color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
    Red,
    Green,
    Blue,
    Violet,
    Orange,
    Sienna,
}

impl Color {
    pub const ALL: [Color; 8] = [
        Color::White,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Violet,
        Color::Orange,
        Color::Sienna,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Active,
    /// The avatar was moved off the board.
    Eliminated,
    /// The player broke the rules too often, or stopped responding.
    Disqualified,
}

/// The state for a single player during one game.
#[derive(Clone, Debug)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub hand: Vec<Tile>,
    pub status: PlayerStatus,
    /// Rejected submissions during the current prompt.
    pub strikes: u8,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: String, color: Color) -> Self {
        Self {
            id,
            name,
            color,
            hand: Vec::new(),
            status: PlayerStatus::Active,
            strikes: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    /// Is some tile in the hand equal to `tile` in one of its rotations?
    pub fn holds(&self, tile: &Tile) -> bool {
        self.hand.iter().any(|hand_tile| hand_tile.is_equal_to_rotated(tile))
    }
}
