use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{Position, TileError};

/// The number of distinct tiles in the deck.
pub const DECK_SIZE: usize = 35;

/// A curve on a tile, connecting two of its 8 ports.
///
/// The segment is undirected: `PathSegment::new(a, b) == PathSegment::new(b, a)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathSegment {
    // Invariant: a < b in clockwise index order
    a: Position,
    b: Position,
}

impl PathSegment {
    pub fn new(p: Position, q: Position) -> Self {
        if p.index() <= q.index() {
            Self { a: p, b: q }
        } else {
            Self { a: q, b: p }
        }
    }

    pub fn endpoints(self) -> (Position, Position) {
        (self.a, self.b)
    }

    /// The other end of the segment, if `pos` is one of its ends.
    pub fn other_end(self, pos: Position) -> Option<Position> {
        if pos == self.a {
            Some(self.b)
        } else if pos == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn rotated(self, k: u8) -> Self {
        Self::new(self.a.rotated(k), self.b.rotated(k))
    }
}

/// A square tile with 4 path segments that together touch all 8 ports exactly once.
///
/// Equality (`==`) ignores the order of the segments, but not the orientation of the
/// tile. Use [`Tile::is_equal_to_rotated()`] to compare tiles up to rotation.
#[derive(Clone, Debug)]
pub struct Tile {
    segments: [PathSegment; 4],
}

impl Tile {
    /// Creates a tile, checking that every port is used by exactly one segment.
    pub fn new(segments: [PathSegment; 4]) -> Result<Self, TileError> {
        let mut seen = [false; 8];
        for segment in segments {
            let (a, b) = segment.endpoints();
            for pos in [a, b] {
                let idx = pos.index() as usize;
                if seen[idx] {
                    return Err(TileError::InvalidTile { duplicate_port: pos });
                }
                seen[idx] = true;
            }
        }
        Ok(Self { segments })
    }

    /// Builds a tile from 4 pairs of clockwise port indices (`0` is `N0`, `7` is `W1`).
    pub(crate) fn from_index_pairs(pairs: [(u8, u8); 4]) -> Result<Self, TileError> {
        Self::new(pairs.map(|(p, q)| {
            PathSegment::new(Position::from_index(p), Position::from_index(q))
        }))
    }

    pub fn segments(&self) -> &[PathSegment; 4] {
        &self.segments
    }

    /// Rotates the tile in place by `k` quarter turns clockwise.
    pub fn rotate(&mut self, k: u8) {
        if k % 4 == 0 {
            return;
        }
        for segment in self.segments.iter_mut() {
            *segment = segment.rotated(k);
        }
    }

    /// An independent copy of this tile, rotated by `k` quarter turns clockwise.
    #[must_use]
    pub fn rotated_copy(&self, k: u8) -> Self {
        let mut copy = self.clone();
        copy.rotate(k);
        copy
    }

    /// The position where an avatar leaves this tile after entering it at `entry`.
    pub fn ending_position(&self, entry: Position) -> Result<Position, TileError> {
        self.segments
            .iter()
            .find_map(|segment| segment.other_end(entry))
            .ok_or(TileError::PortNotFound { position: entry })
    }

    /// Same segments, irrespective of their order.
    pub fn is_equal_to(&self, other: &Tile) -> bool {
        self.sorted_segments() == other.sorted_segments()
    }

    /// Same segments in any of the four orientations of `other`.
    pub fn is_equal_to_rotated(&self, other: &Tile) -> bool {
        (0..4).any(|k| self.is_equal_to(&other.rotated_copy(k)))
    }

    /// Finds this tile in the deck, along with the rotation that turns the
    /// deck tile into this one.
    pub fn to_ref(&self) -> Option<TileRef> {
        deck().iter().enumerate().find_map(|(index, deck_tile)| {
            (0..4)
                .find(|&rotation| deck_tile.rotated_copy(rotation).is_equal_to(self))
                .map(|rotation| TileRef {
                    index: index as u8,
                    rotation,
                })
        })
    }

    fn sorted_segments(&self) -> [PathSegment; 4] {
        let mut segments = self.segments;
        segments.sort();
        segments
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl Eq for Tile {}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for segment in self.sorted_segments() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            let (a, b) = segment.endpoints();
            write!(f, "{}-{}", a, b)?;
        }
        Ok(())
    }
}

/// How tiles travel over the wire: an index into [`deck()`] and a number of
/// clockwise quarter turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRef {
    pub index: u8,
    #[serde(default)]
    pub rotation: u8,
}

impl TileRef {
    pub fn resolve(self) -> Result<Tile, TileError> {
        deck()
            .get(self.index as usize)
            .map(|tile| tile.rotated_copy(self.rotation))
            .ok_or(TileError::UnknownTile { index: self.index })
    }
}

/// The shared deck: every distinct tile (up to rotation) exactly once.
///
/// The order is fixed, since both the server and the clients refer to tiles
/// by their index in this list.
pub fn deck() -> &'static [Tile] {
    static DECK: OnceLock<Vec<Tile>> = OnceLock::new();
    DECK.get_or_init(generate_deck)
}

// Enumerates all perfect matchings of the 8 ports in lexicographic order and
// keeps the first representative of each rotation class.
fn generate_deck() -> Vec<Tile> {
    fn matchings(unmatched: &[u8], current: &mut Vec<(u8, u8)>, out: &mut Vec<[(u8, u8); 4]>) {
        let Some((&first, rest)) = unmatched.split_first() else {
            out.push([current[0], current[1], current[2], current[3]]);
            return;
        };
        for (i, &partner) in rest.iter().enumerate() {
            let remaining: Vec<u8> = rest
                .iter()
                .enumerate()
                .filter_map(|(j, &p)| (j != i).then_some(p))
                .collect();
            current.push((first, partner));
            matchings(&remaining, current, out);
            current.pop();
        }
    }

    let mut all = Vec::new();
    matchings(&[0, 1, 2, 3, 4, 5, 6, 7], &mut Vec::with_capacity(4), &mut all);

    let mut deck: Vec<Tile> = Vec::with_capacity(DECK_SIZE);
    for pairs in all {
        let tile = Tile::from_index_pairs(pairs)
            .unwrap_or_else(|err| unreachable!("generated an invalid matching: {}", err));
        if !deck.iter().any(|existing| existing.is_equal_to_rotated(&tile)) {
            deck.push(tile);
        }
    }
    debug_assert_eq!(deck.len(), DECK_SIZE);
    deck
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;

    use super::*;
    use crate::{Direction, Port};

    fn covers_all_ports(tile: &Tile) -> bool {
        let mut seen = [0u8; 8];
        for segment in tile.segments() {
            let (a, b) = segment.endpoints();
            seen[a.index() as usize] += 1;
            seen[b.index() as usize] += 1;
        }
        seen.iter().all(|&n| n == 1)
    }

    quickcheck! {
        fn every_rotation_keeps_the_port_invariant(tile: Tile, k: u8) -> bool {
            covers_all_ports(&tile.rotated_copy(k))
        }

        fn rotated_copies_are_rotation_equal(tile: Tile, k: u8) -> bool {
            tile.is_equal_to_rotated(&tile.rotated_copy(k))
                && tile.rotated_copy(k).is_equal_to_rotated(&tile)
        }

        fn ending_position_is_symmetric(tile: Tile, pos: Position) -> bool {
            let end = tile.ending_position(pos).unwrap();
            end != pos && tile.ending_position(end).unwrap() == pos
        }

        fn every_tile_is_in_the_deck(tile: Tile) -> bool {
            match tile.to_ref() {
                Some(tile_ref) => tile_ref.resolve().unwrap() == tile,
                None => false,
            }
        }
    }

    #[test]
    fn deck_has_35_distinct_tiles() {
        let deck = deck();
        assert_eq!(deck.len(), DECK_SIZE);
        for (i, a) in deck.iter().enumerate() {
            assert!(covers_all_ports(a));
            for b in &deck[i + 1..] {
                assert!(!a.is_equal_to_rotated(b), "{} and {} are the same tile", a, b);
            }
        }
        // The order is part of the wire format.
        let u_turn = Tile::from_index_pairs([(0, 1), (2, 3), (4, 5), (6, 7)]).unwrap();
        assert_eq!(deck[0], u_turn);
    }

    #[test]
    fn rejects_tiles_with_reused_ports() {
        let err = Tile::from_index_pairs([(0, 1), (1, 2), (4, 5), (6, 7)]).unwrap_err();
        assert_eq!(
            err,
            TileError::InvalidTile {
                duplicate_port: Position::new(Direction::North, Port::Second)
            }
        );
    }

    #[test]
    fn exact_equality_ignores_segment_order_but_not_rotation() {
        let a = Tile::from_index_pairs([(0, 1), (2, 3), (4, 5), (6, 7)]).unwrap();
        let b = Tile::from_index_pairs([(7, 6), (5, 4), (3, 2), (1, 0)]).unwrap();
        assert!(a.is_equal_to(&b));

        let c = Tile::from_index_pairs([(0, 5), (1, 4), (2, 3), (6, 7)]).unwrap();
        assert!(!c.is_equal_to(&c.rotated_copy(1)));
        assert!(c.is_equal_to_rotated(&c.rotated_copy(1)));
        assert!(c.is_equal_to(&c.rotated_copy(4)));
    }

    #[test]
    fn rotation_moves_paths_clockwise() {
        // A single U-turn on the north side ends up on the east side.
        let mut tile = Tile::from_index_pairs([(0, 1), (2, 5), (3, 4), (6, 7)]).unwrap();
        let north_0 = Position::new(Direction::North, Port::First);
        let east_0 = Position::new(Direction::East, Port::First);
        assert_eq!(
            tile.ending_position(north_0).unwrap(),
            Position::new(Direction::North, Port::Second)
        );
        tile.rotate(1);
        assert_eq!(
            tile.ending_position(east_0).unwrap(),
            Position::new(Direction::East, Port::Second)
        );
        tile.rotate(0);
        assert_eq!(
            tile.ending_position(east_0).unwrap(),
            Position::new(Direction::East, Port::Second)
        );
    }

    #[test]
    fn unknown_tile_index() {
        let tile_ref = TileRef {
            index: DECK_SIZE as u8,
            rotation: 0,
        };
        assert_eq!(
            tile_ref.resolve().unwrap_err(),
            TileError::UnknownTile {
                index: DECK_SIZE as u8
            }
        );
    }
}
