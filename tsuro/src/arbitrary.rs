use quickcheck::{Arbitrary, Gen};

use crate::{
    BoardState, Color, Coordinate, Direction, PlayerId, PlayerState, Port, Position, Tile,
    BOARD_SIZE,
};

/// N0-S1, N1-S0, E0-W1, E1-W0: every path goes straight through.
pub fn straight_tile() -> Tile {
    Tile::from_index_pairs([(0, 5), (1, 4), (2, 7), (3, 6)]).unwrap()
}

/// Every path makes a U-turn on its own side.
pub fn u_turn_tile() -> Tile {
    Tile::from_index_pairs([(0, 1), (2, 3), (4, 5), (6, 7)]).unwrap()
}

fn below(g: &mut Gen, n: usize) -> usize {
    usize::arbitrary(g) % n
}

impl Arbitrary for Direction {
    fn arbitrary(g: &mut Gen) -> Self {
        *g.choose(&Direction::ALL).unwrap()
    }
}

impl Arbitrary for Port {
    fn arbitrary(g: &mut Gen) -> Self {
        *g.choose(&[Port::First, Port::Second]).unwrap()
    }
}

impl Arbitrary for Position {
    fn arbitrary(g: &mut Gen) -> Self {
        Position::new(Direction::arbitrary(g), Port::arbitrary(g))
    }
}

impl Arbitrary for Coordinate {
    fn arbitrary(g: &mut Gen) -> Self {
        let x = below(g, BOARD_SIZE as usize) as u8;
        let y = below(g, BOARD_SIZE as usize) as u8;
        Coordinate::new(x, y).unwrap()
    }
}

impl Arbitrary for Tile {
    fn arbitrary(g: &mut Gen) -> Self {
        // Shuffle the 8 ports and pair them up in order
        let mut ports: Vec<u8> = (0..8).collect();
        for i in (1..ports.len()).rev() {
            let j = below(g, i + 1);
            ports.swap(i, j);
        }
        Tile::from_index_pairs([
            (ports[0], ports[1]),
            (ports[2], ports[3]),
            (ports[4], ports[5]),
            (ports[6], ports[7]),
        ])
        .unwrap()
    }
}

// Plays a few random, rule-agnostic moves: avatars start on the border, and
// tiles are dropped on random empty cells or in front of an avatar.
fn arbitrary_board(g: &mut Gen, num_players: u8) -> BoardState {
    let mut board = BoardState::new();
    for player in 0..num_players {
        for _attempt in 0..10 {
            let coordinate = Coordinate::arbitrary(g);
            let outward: Vec<Position> = Position::all()
                .into_iter()
                .filter(|&pos| BoardState::is_avatar_on_outside_position(coordinate, pos))
                .collect();
            if outward.is_empty() || board.get_tile(coordinate).is_some() {
                continue;
            }
            let start = *g.choose(&outward).unwrap();
            if board
                .place_initial(PlayerId(player), Tile::arbitrary(g), coordinate, start)
                .is_ok()
            {
                break;
            }
        }
    }
    let num_tiles = below(g, 30);
    for _ in 0..num_tiles {
        let facing: Vec<Coordinate> = board
            .avatars()
            .filter_map(|(_, avatar)| avatar.facing())
            .collect();
        let coordinate = if !facing.is_empty() && bool::arbitrary(g) {
            *g.choose(&facing).unwrap()
        } else {
            Coordinate::arbitrary(g)
        };
        let _ = board.place_tile(Tile::arbitrary(g), coordinate);
    }
    board
}

#[derive(Clone, Debug)]
pub struct BoardWithPlacement {
    pub board: BoardState,
    pub tile: Tile,
    pub coordinate: Coordinate,
}

impl Arbitrary for BoardWithPlacement {
    fn arbitrary(g: &mut Gen) -> Self {
        let num_players = 1 + below(g, 4) as u8;
        let board = arbitrary_board(g, num_players);
        let facing: Vec<Coordinate> = board
            .avatars()
            .filter_map(|(_, avatar)| avatar.facing())
            .collect();
        let coordinate = match g.choose(&facing) {
            Some(&c) if bool::arbitrary(g) => c,
            _ => Coordinate::arbitrary(g),
        };
        Self {
            board,
            tile: Tile::arbitrary(g),
            coordinate,
        }
    }
}

/// A board, a player (player 0, whose avatar may or may not still be on the
/// board) with a random hand, and a proposed placement from that hand.
#[derive(Clone, Debug)]
pub struct BoardWithPlayer {
    pub board: BoardState,
    pub player: PlayerState,
    pub tile: Tile,
    pub coordinate: Coordinate,
}

impl Arbitrary for BoardWithPlayer {
    fn arbitrary(g: &mut Gen) -> Self {
        let num_players = 1 + below(g, 3) as u8;
        let board = arbitrary_board(g, num_players);
        let mut player = PlayerState::new(PlayerId(0), String::from("quickcheck"), Color::Green);
        player.hand = (0..1 + below(g, 3)).map(|_| Tile::arbitrary(g)).collect();
        let tile = player.hand[below(g, player.hand.len())].rotated_copy(below(g, 4) as u8);
        let facing = board.get_avatar(player.id).and_then(|avatar| avatar.facing());
        let coordinate = match facing {
            Some(c) if below(g, 4) != 0 => c,
            _ => Coordinate::arbitrary(g),
        };
        Self {
            board,
            player,
            tile,
            coordinate,
        }
    }
}
