use crate::{Coordinate, Position};

/// Where a player's token stands: on the tile at `coordinate`, at the port
/// `position` through which it will leave the tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Avatar {
    pub coordinate: Coordinate,
    pub position: Position,
}

impl Avatar {
    /// The cell the avatar moves into next, or `None` if it faces the edge of the board.
    pub fn facing(&self) -> Option<Coordinate> {
        self.coordinate.step(self.position.direction)
    }
}
