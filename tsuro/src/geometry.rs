use serde::{Deserialize, Serialize};

/// The number of cells along each side of the (square) board.
pub const BOARD_SIZE: u8 = 10;

/// One of the four sides of a tile, and the direction of the neighboring cell
/// behind that side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "W")]
    West,
}

impl Direction {
    /// All directions, in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn opposite(self) -> Self {
        self.rotated(2)
    }

    /// The direction after rotating the tile by `k` quarter turns clockwise.
    pub fn rotated(self, k: u8) -> Self {
        Self::ALL[(self as usize + k as usize) % 4]
    }

    fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self {
            Direction::North => 'N',
            Direction::East => 'E',
            Direction::South => 'S',
            Direction::West => 'W',
        };
        write!(f, "{}", c)
    }
}

/// A cell on the board.
///
/// `x` grows eastward and `y` grows southward, both in `0..BOARD_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    x: u8,
    y: u8,
}

#[derive(Deserialize)]
struct RawCoordinate {
    x: u8,
    y: u8,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = String;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.x, raw.y)
            .ok_or_else(|| format!("coordinate ({}, {}) is off the board", raw.x, raw.y))
    }
}

impl Coordinate {
    /// Returns `None` if the coordinate is not on the board.
    pub fn new(x: u8, y: u8) -> Option<Self> {
        (x < BOARD_SIZE && y < BOARD_SIZE).then_some(Self { x, y })
    }

    pub fn x(self) -> u8 {
        self.x
    }

    pub fn y(self) -> u8 {
        self.y
    }

    /// The neighboring cell in the given direction, or `None` if that would
    /// leave the grid.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.delta();
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Self::new(x, y)
    }

    /// The (up to four) orthogonal neighbors that are on the board.
    pub fn neighbors(self) -> impl Iterator<Item = Coordinate> {
        Direction::ALL.into_iter().filter_map(move |d| self.step(d))
    }

    /// Is this cell on the outermost ring of the board?
    pub fn is_on_border(self) -> bool {
        Direction::ALL.into_iter().any(|d| self.step(d).is_none())
    }

    /// Iterates over every cell of the board in row-major order.
    pub fn all() -> impl Iterator<Item = Coordinate> {
        (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Coordinate { x, y }))
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the two connection points on a tile side.
///
/// Ports are numbered clockwise around the tile: on the north side port 0 is
/// the western one, on the east side port 0 is the northern one, and so on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Port {
    First,
    Second,
}

impl TryFrom<u8> for Port {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Port::First),
            1 => Ok(Port::Second),
            _ => Err(format!("port must be 0 or 1, got {}", value)),
        }
    }
}

impl From<Port> for u8 {
    fn from(port: Port) -> u8 {
        match port {
            Port::First => 0,
            Port::Second => 1,
        }
    }
}

impl Port {
    pub fn other(self) -> Self {
        match self {
            Port::First => Port::Second,
            Port::Second => Port::First,
        }
    }
}

/// One of the 8 connection points on the boundary of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub port: Port,
}

impl Position {
    pub const fn new(direction: Direction, port: Port) -> Self {
        Self { direction, port }
    }

    /// All 8 positions, clockwise starting at the western port of the north side.
    pub fn all() -> [Position; 8] {
        std::array::from_fn(|idx| Self::from_index(idx as u8))
    }

    /// The index of this position in the clockwise order of [`Self::all()`].
    pub fn index(self) -> u8 {
        self.direction as u8 * 2 + u8::from(self.port)
    }

    pub(crate) fn from_index(idx: u8) -> Self {
        let port = if idx % 2 == 0 { Port::First } else { Port::Second };
        Self {
            direction: Direction::ALL[(idx / 2 % 4) as usize],
            port,
        }
    }

    /// The position on the neighboring tile that touches this one across the
    /// shared edge.
    pub fn reflect(self) -> Self {
        Self {
            direction: self.direction.opposite(),
            port: self.port.other(),
        }
    }

    /// Where this position ends up after rotating its tile by `k` quarter
    /// turns clockwise.
    pub fn rotated(self, k: u8) -> Self {
        Self {
            direction: self.direction.rotated(k),
            port: self.port,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.direction, u8::from(self.port))
    }
}
