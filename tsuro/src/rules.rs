//! Legality checks for proposed placements.
//!
//! None of these functions mutate the board they are given. Whenever a
//! placement has to be tried out, it is played on a clone of the board,
//! which is then thrown away. Checking the whole hand thus costs up to
//! 4 × (hand size) board clones.

use crate::{
    BoardState, Coordinate, IllegalMove, InitialPlacement, IntermediatePlacement, PlayerId,
    PlayerState, Position, Tile,
};

/// Is placing `tile` (in exactly this orientation) at `coordinate` a legal turn for `player`?
pub fn can_take_action(
    state: &BoardState,
    tile: &Tile,
    coordinate: Coordinate,
    player: &PlayerState,
) -> bool {
    validate_action(state, tile, coordinate, player).is_ok()
}

/// Like [`can_take_action()`], but explains why a placement is illegal.
pub fn validate_action(
    state: &BoardState,
    tile: &Tile,
    coordinate: Coordinate,
    player: &PlayerState,
) -> Result<(), IllegalMove> {
    check_placement_legality(state, tile, coordinate, player)?;
    check_hand_validity(state, tile, coordinate, player)
}

/// Checks everything about a placement except whether it is suicidal: the
/// player has an avatar, the cell is empty and directly in front of the
/// avatar, and the tile comes from the player's hand.
pub fn check_placement_legality(
    state: &BoardState,
    tile: &Tile,
    coordinate: Coordinate,
    player: &PlayerState,
) -> Result<(), IllegalMove> {
    let avatar = state.get_avatar(player.id).ok_or(IllegalMove::NoAvatar)?;
    if state.get_tile(coordinate).is_some() {
        return Err(IllegalMove::CoordinateOccupied { coordinate });
    }
    if avatar.facing() != Some(coordinate) {
        return Err(IllegalMove::NotFacingCoordinate { coordinate });
    }
    if !player.holds(tile) {
        return Err(IllegalMove::TileNotInHand);
    }
    Ok(())
}

/// Does the player's avatar survive placing `tile` at `coordinate`?
pub fn check_placement_validity(
    state: &BoardState,
    tile: &Tile,
    coordinate: Coordinate,
    player: PlayerId,
) -> Result<(), IllegalMove> {
    if survives(state, tile, coordinate, player)? {
        Ok(())
    } else {
        Err(IllegalMove::Suicidal)
    }
}

/// A suicidal placement is only accepted if every tile in the hand, in every
/// rotation, would be suicidal at the same coordinate as well.
pub fn check_hand_validity(
    state: &BoardState,
    tile: &Tile,
    coordinate: Coordinate,
    player: &PlayerState,
) -> Result<(), IllegalMove> {
    if survives(state, tile, coordinate, player.id)? {
        return Ok(());
    }
    for (hand_index, hand_tile) in player.hand.iter().enumerate() {
        for rotation in 0..4 {
            if survives(state, &hand_tile.rotated_copy(rotation), coordinate, player.id)? {
                return Err(IllegalMove::SuicideWithAlternative {
                    hand_index,
                    rotation,
                });
            }
        }
    }
    Ok(())
}

/// Can `player` start the game by placing `tile` at `coordinate` and their
/// avatar on it at `position`?
pub fn can_place_avatar(
    state: &BoardState,
    player: PlayerId,
    coordinate: Coordinate,
    tile: &Tile,
    position: Position,
) -> bool {
    validate_initial_placement(state, player, coordinate, tile, position).is_ok()
}

/// Like [`can_place_avatar()`], but explains why a placement is illegal.
pub fn validate_initial_placement(
    state: &BoardState,
    player: PlayerId,
    coordinate: Coordinate,
    tile: &Tile,
    position: Position,
) -> Result<(), IllegalMove> {
    if !BoardState::is_avatar_on_outside_position(coordinate, position) {
        return Err(IllegalMove::StartNotOnBoundary {
            coordinate,
            position,
        });
    }
    if state.get_avatar(player).is_some() {
        return Err(IllegalMove::AvatarAlreadyPlaced);
    }
    if state.get_tile(coordinate).is_some() {
        return Err(IllegalMove::CoordinateOccupied { coordinate });
    }
    if state.has_neighboring_tiles(coordinate) {
        return Err(IllegalMove::HasNeighboringTiles { coordinate });
    }
    check_is_move_on_board(coordinate, tile, position)
}

/// The path the avatar takes across its first tile must not lead straight
/// back off the board.
pub fn check_is_move_on_board(
    coordinate: Coordinate,
    tile: &Tile,
    position: Position,
) -> Result<(), IllegalMove> {
    let exit = tile
        .ending_position(position)
        .map_err(|err| IllegalMove::Simulation(err.into()))?;
    match coordinate.step(exit.direction) {
        Some(_) => Ok(()),
        None => Err(IllegalMove::StartLeavesBoard { coordinate, exit }),
    }
}

/// Every placement the player could legally make this turn.
pub fn legal_actions(state: &BoardState, player: &PlayerState) -> Vec<IntermediatePlacement> {
    let Some(coordinate) = state.get_avatar(player.id).and_then(|avatar| avatar.facing()) else {
        return Vec::new();
    };
    let mut actions = Vec::new();
    for (tile_index, hand_tile) in player.hand.iter().enumerate() {
        for rotation in 0..4 {
            let tile = hand_tile.rotated_copy(rotation);
            if can_take_action(state, &tile, coordinate, player) {
                actions.push(IntermediatePlacement {
                    tile: tile_index,
                    rotation,
                    coordinate,
                });
            }
        }
    }
    actions
}

/// Every first placement the player could legally make, trying each hand tile
/// in each rotation on every edge cell.
pub fn legal_initial_placements(state: &BoardState, player: &PlayerState) -> Vec<InitialPlacement> {
    let mut placements = Vec::new();
    for coordinate in Coordinate::all().filter(|c| c.is_on_border()) {
        for position in Position::all() {
            if !BoardState::is_avatar_on_outside_position(coordinate, position) {
                continue;
            }
            for (tile_index, hand_tile) in player.hand.iter().enumerate() {
                for rotation in 0..4 {
                    let tile = hand_tile.rotated_copy(rotation);
                    if can_place_avatar(state, player.id, coordinate, &tile, position) {
                        placements.push(InitialPlacement {
                            tile: tile_index,
                            rotation,
                            coordinate,
                            position,
                        });
                    }
                }
            }
        }
    }
    placements
}

fn survives(
    state: &BoardState,
    tile: &Tile,
    coordinate: Coordinate,
    player: PlayerId,
) -> Result<bool, IllegalMove> {
    let mut copy = state.clone();
    copy.place_tile(tile.clone(), coordinate)
        .map_err(IllegalMove::Simulation)?;
    Ok(copy.get_avatar(player).is_some())
}
