use serde::{Deserialize, Serialize};

use super::{Avatar, BoardState};
use crate::{Coordinate, PlayerId, Position, TileError, TileRef};

/// The serializable form of a [`BoardState`], as broadcast to clients.
///
/// Tiles are sorted by coordinate and avatars by player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub tiles: Vec<PlacedTile>,
    pub avatars: Vec<AvatarView>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub coordinate: Coordinate,
    pub tile: TileRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarView {
    pub player: PlayerId,
    pub coordinate: Coordinate,
    pub position: Position,
}

impl BoardState {
    pub fn view(&self) -> BoardView {
        let tiles = self
            .tiles
            .iter()
            .filter_map(|(&coordinate, tile)| {
                // Every tile is a rotation of some deck tile, so this never skips anything.
                tile.to_ref().map(|tile| PlacedTile { coordinate, tile })
            })
            .collect();
        let avatars = self
            .avatars
            .iter()
            .map(|(&player, avatar)| AvatarView {
                player,
                coordinate: avatar.coordinate,
                position: avatar.position,
            })
            .collect();
        BoardView { tiles, avatars }
    }

    /// Rebuilds a board from its view, without moving any avatars.
    pub fn from_view(view: &BoardView) -> Result<Self, TileError> {
        let mut board = BoardState::new();
        for placed in &view.tiles {
            board.tiles.insert(placed.coordinate, placed.tile.resolve()?);
        }
        for avatar in &view.avatars {
            board.avatars.insert(
                avatar.player,
                Avatar {
                    coordinate: avatar.coordinate,
                    position: avatar.position,
                },
            );
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::straight_tile;
    use crate::{Direction, Port};

    #[test]
    fn view_round_trips_through_json() {
        let mut board = BoardState::new();
        let start = Position::new(Direction::North, Port::Second);
        board
            .place_initial(PlayerId(2), straight_tile(), Coordinate::new(6, 0).unwrap(), start)
            .unwrap();
        board
            .place_tile(straight_tile().rotated_copy(1), Coordinate::new(6, 1).unwrap())
            .unwrap();

        let view = board.view();
        assert_eq!(view.tiles.len(), 2);
        assert_eq!(view.avatars.len(), 1);
        let json = serde_json::to_string(&view).unwrap();
        let parsed: BoardView = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, view);

        let rebuilt = BoardState::from_view(&parsed).unwrap();
        assert_eq!(rebuilt.view(), view);
        assert_eq!(rebuilt.get_avatar(PlayerId(2)), board.get_avatar(PlayerId(2)));
        let c = Coordinate::new(6, 1).unwrap();
        assert_eq!(rebuilt.get_tile(c), board.get_tile(c));
    }
}
