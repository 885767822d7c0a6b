use crate::{ActionKind, Coordinate, PlayerId, Position};

/// A violated invariant of a single tile, or a reference to a tile that does not exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileError {
    InvalidTile { duplicate_port: Position },
    UnknownTile { index: u8 },
    PortNotFound { position: Position },
}

impl std::error::Error for TileError {}

impl std::fmt::Display for TileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileError::InvalidTile { duplicate_port } => write!(
                f,
                "A tile must use every port exactly once, but {} is used twice",
                duplicate_port
            ),
            TileError::UnknownTile { index } => {
                write!(f, "There is no tile with index {} in the deck", index)
            }
            TileError::PortNotFound { position } => {
                write!(f, "No path on the tile starts at {}", position)
            }
        }
    }
}

/// The error type for mutating a [`BoardState`](crate::BoardState).
///
/// If an error is returned, the board is unmodified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardError {
    OccupiedCoordinate { coordinate: Coordinate },
    AvatarAlreadyPlaced { player: PlayerId },
    MissingTile { coordinate: Coordinate },
    InfiniteLoopDetected { coordinate: Coordinate, steps: usize },
    Tile(TileError),
}

impl std::error::Error for BoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoardError::Tile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TileError> for BoardError {
    fn from(err: TileError) -> Self {
        BoardError::Tile(err)
    }
}

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardError::OccupiedCoordinate { coordinate } => {
                write!(f, "There already is a tile at {}", coordinate)
            }
            BoardError::AvatarAlreadyPlaced { player } => {
                write!(f, "{} already has an avatar on the board", player)
            }
            BoardError::MissingTile { coordinate } => {
                write!(f, "An avatar stands at {}, but there is no tile", coordinate)
            }
            BoardError::InfiniteLoopDetected { coordinate, steps } => write!(
                f,
                "An avatar starting at {} was still moving after {} steps",
                coordinate, steps
            ),
            BoardError::Tile(_) => write!(f, "Invalid tile"),
        }
    }
}

/// Why an action was rejected. The player may be asked again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IllegalMove {
    HandIndexOutOfRange { index: usize, hand_size: usize },
    WrongActionKind { expected: ActionKind },
    NoAvatar,
    AvatarAlreadyPlaced,
    CoordinateOccupied { coordinate: Coordinate },
    NotFacingCoordinate { coordinate: Coordinate },
    TileNotInHand,
    SuicideWithAlternative { hand_index: usize, rotation: u8 },
    Suicidal,
    StartNotOnBoundary { coordinate: Coordinate, position: Position },
    HasNeighboringTiles { coordinate: Coordinate },
    StartLeavesBoard { coordinate: Coordinate, exit: Position },
    TimedOut,
    NoResponse,
    InvalidId { claimed: PlayerId },
    Simulation(BoardError),
}

impl std::error::Error for IllegalMove {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IllegalMove::Simulation(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IllegalMove::HandIndexOutOfRange { index, hand_size } => write!(
                f,
                "Tried to play tile {} from a hand of {} tiles",
                index, hand_size
            ),
            IllegalMove::WrongActionKind { expected } => {
                write!(f, "Expected an {} placement", expected)
            }
            IllegalMove::NoAvatar => write!(f, "The player has no avatar on the board"),
            IllegalMove::AvatarAlreadyPlaced => {
                write!(f, "The player already placed their avatar")
            }
            IllegalMove::CoordinateOccupied { coordinate } => {
                write!(f, "There already is a tile at {}", coordinate)
            }
            IllegalMove::NotFacingCoordinate { coordinate } => write!(
                f,
                "Tiles must be placed in front of the avatar, but {} is not",
                coordinate
            ),
            IllegalMove::TileNotInHand => {
                write!(f, "Tried to play a tile that was not in the player's hand")
            }
            IllegalMove::SuicideWithAlternative {
                hand_index,
                rotation,
            } => write!(
                f,
                "The placement eliminates the player, but tile {} rotated {} times would not",
                hand_index, rotation
            ),
            IllegalMove::Suicidal => write!(f, "The placement eliminates the player"),
            IllegalMove::StartNotOnBoundary {
                coordinate,
                position,
            } => write!(
                f,
                "Avatars must start on the edge of the board, but {} at {} does not face it",
                position, coordinate
            ),
            IllegalMove::HasNeighboringTiles { coordinate } => write!(
                f,
                "The first tile cannot be placed next to another tile, but {} is",
                coordinate
            ),
            IllegalMove::StartLeavesBoard { coordinate, exit } => write!(
                f,
                "The first tile at {} would lead the avatar off the board through {}",
                coordinate, exit
            ),
            IllegalMove::TimedOut => write!(f, "No action was submitted in time"),
            IllegalMove::NoResponse => write!(f, "The player disconnected"),
            IllegalMove::InvalidId { claimed } => {
                write!(f, "The action was submitted on behalf of {}", claimed)
            }
            IllegalMove::Simulation(_) => write!(f, "Simulating the placement failed"),
        }
    }
}

/// Errors while players are joining or the game is starting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LobbyError {
    DuplicateIdentity { name: String },
    DuplicateColor,
    PoolFull,
    AlreadyStarted,
    NotEnoughPlayers { joined: usize, required: usize },
}

impl std::error::Error for LobbyError {}

impl std::fmt::Display for LobbyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LobbyError::DuplicateIdentity { name } => {
                write!(f, "The name '{}' is already taken", name)
            }
            LobbyError::DuplicateColor => write!(f, "The color is already taken"),
            LobbyError::PoolFull => write!(f, "The game is full"),
            LobbyError::AlreadyStarted => write!(f, "The game has already started"),
            LobbyError::NotEnoughPlayers { joined, required } => write!(
                f,
                "{} players joined, but at least {} are required",
                joined, required
            ),
        }
    }
}

/// A submission that was not even considered, because it was not the
/// submitter's turn. These never count against the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitError {
    NotRunning,
    OutOfTurn { expected: PlayerId, got: PlayerId },
}

impl std::error::Error for SubmitError {}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::NotRunning => write!(f, "The game is not accepting actions"),
            SubmitError::OutOfTurn { expected, got } => {
                write!(f, "It is {}'s turn, not {}'s", expected, got)
            }
        }
    }
}

/// A line from a client that could not be turned into a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    MalformedInput { reason: String },
    UnknownAction { name: String },
}

impl std::error::Error for ProtocolError {}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::MalformedInput { reason } => write!(f, "Malformed input: {}", reason),
            ProtocolError::UnknownAction { name } => write!(f, "Unknown action '{}'", name),
        }
    }
}
