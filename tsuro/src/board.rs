mod avatar;
mod view;

use std::collections::BTreeMap;

pub use avatar::*;
pub use view::*;

use crate::{BoardError, Coordinate, PlayerId, Position, Tile};

/// The tiles on the board and the avatars standing on them.
///
/// Cloning a board produces a fully independent copy, which is what the rule
/// checker uses to try out placements without touching the real game.
#[derive(Clone, Debug, Default)]
pub struct BoardState {
    tiles: BTreeMap<Coordinate, Tile>,
    /// Only avatars that are still on the board. Every avatar stands on a tile.
    avatars: BTreeMap<PlayerId, Avatar>,
}

/// What happened to the avatars as a result of placing a tile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    /// Avatars that moved and are still on the board, in player order.
    pub moved: Vec<PlayerId>,
    /// Avatars that moved off the board and were removed, in player order.
    pub eliminated: Vec<PlayerId>,
}

// Where an avatar ends up after following the paths.
enum Destination {
    Rests(Avatar),
    OffBoard,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_tile(&self, coordinate: Coordinate) -> Option<&Tile> {
        self.tiles.get(&coordinate)
    }

    pub fn get_avatar(&self, player: PlayerId) -> Option<Avatar> {
        self.avatars.get(&player).copied()
    }

    pub fn tiles(&self) -> impl Iterator<Item = (Coordinate, &Tile)> {
        self.tiles.iter().map(|(&c, t)| (c, t))
    }

    pub fn avatars(&self) -> impl Iterator<Item = (PlayerId, Avatar)> + '_ {
        self.avatars.iter().map(|(&p, &a)| (p, a))
    }

    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Is there a tile on any of the four cells next to `coordinate`?
    pub fn has_neighboring_tiles(&self, coordinate: Coordinate) -> bool {
        coordinate
            .neighbors()
            .any(|neighbor| self.tiles.contains_key(&neighbor))
    }

    /// Does an avatar standing at `position` on the tile at `coordinate` face
    /// the edge of the board?
    pub fn is_avatar_on_outside_position(coordinate: Coordinate, position: Position) -> bool {
        coordinate.step(position.direction).is_none()
    }

    /// Places a tile and moves every avatar that faces it along the paths.
    ///
    /// An avatar keeps moving as long as the path leads onto another tile, so it
    /// may cross several tiles in one placement. Avatars that leave the board are
    /// removed.
    pub fn place_tile(&mut self, tile: Tile, coordinate: Coordinate) -> Result<Placement, BoardError> {
        if self.tiles.contains_key(&coordinate) {
            return Err(BoardError::OccupiedCoordinate { coordinate });
        }
        let movers: Vec<(PlayerId, Avatar)> = self
            .avatars()
            .filter(|(_, avatar)| avatar.facing() == Some(coordinate))
            .collect();

        self.tiles.insert(coordinate, tile);
        let mut destinations = Vec::with_capacity(movers.len());
        for (player, avatar) in movers {
            match self.travel(coordinate, avatar.position.reflect()) {
                Ok(destination) => destinations.push((player, destination)),
                Err(err) => {
                    self.tiles.remove(&coordinate);
                    return Err(err);
                }
            }
        }

        Ok(self.apply(destinations))
    }

    /// Places the first tile of a player along with their avatar, which enters
    /// the tile at `start` and immediately follows the path.
    pub fn place_initial(
        &mut self,
        player: PlayerId,
        tile: Tile,
        coordinate: Coordinate,
        start: Position,
    ) -> Result<Placement, BoardError> {
        if self.avatars.contains_key(&player) {
            return Err(BoardError::AvatarAlreadyPlaced { player });
        }
        if self.tiles.contains_key(&coordinate) {
            return Err(BoardError::OccupiedCoordinate { coordinate });
        }
        // Validate the entry port before mutating anything.
        tile.ending_position(start)?;
        self.tiles.insert(coordinate, tile);
        match self.travel(coordinate, start) {
            Ok(destination) => Ok(self.apply(vec![(player, destination)])),
            Err(err) => {
                self.tiles.remove(&coordinate);
                Err(err)
            }
        }
    }

    /// Takes an avatar off the board, e.g. when its player is disqualified.
    pub fn remove_avatar(&mut self, player: PlayerId) -> Option<Avatar> {
        self.avatars.remove(&player)
    }

    /// Follows the paths from `entry` on the tile at `coordinate`, one tile at a time.
    fn travel(&self, coordinate: Coordinate, entry: Position) -> Result<Destination, BoardError> {
        // Each of the 4 segments of a tile can be traversed at most once by a
        // path that does not loop.
        let max_steps = 4 * self.tiles.len();
        let (mut current, mut entry) = (coordinate, entry);
        for _ in 0..max_steps {
            let tile = self
                .tiles
                .get(&current)
                .ok_or(BoardError::MissingTile { coordinate: current })?;
            let exit = tile.ending_position(entry)?;
            match current.step(exit.direction) {
                None => return Ok(Destination::OffBoard),
                Some(next) if self.tiles.contains_key(&next) => {
                    current = next;
                    entry = exit.reflect();
                }
                Some(_) => {
                    return Ok(Destination::Rests(Avatar {
                        coordinate: current,
                        position: exit,
                    }))
                }
            }
        }
        Err(BoardError::InfiniteLoopDetected {
            coordinate,
            steps: max_steps,
        })
    }

    fn apply(&mut self, destinations: Vec<(PlayerId, Destination)>) -> Placement {
        let mut placement = Placement::default();
        for (player, destination) in destinations {
            match destination {
                Destination::Rests(avatar) => {
                    self.avatars.insert(player, avatar);
                    placement.moved.push(player);
                }
                Destination::OffBoard => {
                    self.avatars.remove(&player);
                    placement.eliminated.push(player);
                }
            }
        }
        placement
    }
}
