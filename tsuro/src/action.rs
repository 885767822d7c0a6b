use serde::{Deserialize, Serialize};

use crate::{Coordinate, Position};

/// What a player does on their turn.
///
/// Tiles are referred to by their index in the player's hand, together with
/// the number of clockwise quarter turns to apply before placing them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Action {
    /// Place a first tile on the edge of the board, and the avatar on it.
    Initial(InitialPlacement),
    /// Place a tile in front of the avatar.
    Intermediate(IntermediatePlacement),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialPlacement {
    pub tile: usize,
    #[serde(default)]
    pub rotation: u8,
    pub coordinate: Coordinate,
    /// The port facing off the board where the avatar enters the tile.
    pub position: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediatePlacement {
    pub tile: usize,
    #[serde(default)]
    pub rotation: u8,
    pub coordinate: Coordinate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Initial,
    Intermediate,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Initial(_) => ActionKind::Initial,
            Action::Intermediate(_) => ActionKind::Intermediate,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Initial => write!(f, "initial"),
            ActionKind::Intermediate => write!(f, "intermediate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Port};

    #[test]
    fn wire_format_is_tagged() {
        let action = Action::Initial(InitialPlacement {
            tile: 2,
            rotation: 1,
            coordinate: Coordinate::new(0, 4).unwrap(),
            position: Position::new(Direction::West, Port::First),
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "initial");
        assert_eq!(json["coordinate"]["y"], 4);
        assert_eq!(json["position"]["direction"], "W");
        assert_eq!(serde_json::from_value::<Action>(json).unwrap(), action);

        let parsed: Action = serde_json::from_str(
            r#"{"kind":"intermediate","tile":0,"coordinate":{"x":1,"y":0}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            Action::Intermediate(IntermediatePlacement {
                tile: 0,
                rotation: 0,
                coordinate: Coordinate::new(1, 0).unwrap(),
            })
        );
    }
}
