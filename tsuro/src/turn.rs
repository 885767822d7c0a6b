use crate::rules::{validate_action, validate_initial_placement};
use crate::{
    BoardState, IllegalMove, InitialPlacement, IntermediatePlacement, Placement, PlayerState, Tile,
};

/// A rotated copy of the tile at `index` in the player's hand.
fn tile_from_hand(state: &PlayerState, index: usize, rotation: u8) -> Result<Tile, IllegalMove> {
    state
        .hand
        .get(index)
        .map(|tile| tile.rotated_copy(rotation))
        .ok_or(IllegalMove::HandIndexOutOfRange {
            index,
            hand_size: state.hand.len(),
        })
}

/// Validates and plays a player's first tile, which also puts their avatar on the board.
///
/// If an error is returned, neither the board nor the player's hand was modified.
pub fn execute_initial_placement(
    state: &mut PlayerState,
    board: &mut BoardState,
    action: InitialPlacement,
) -> Result<Placement, IllegalMove> {
    let tile = tile_from_hand(state, action.tile, action.rotation)?;
    validate_initial_placement(board, state.id, action.coordinate, &tile, action.position)?;
    let placement = board
        .place_initial(state.id, tile, action.coordinate, action.position)
        .map_err(IllegalMove::Simulation)?;
    state.hand.remove(action.tile);
    Ok(placement)
}

/// Validates and plays a tile in front of the player's avatar.
///
/// If an error is returned, neither the board nor the player's hand was modified.
pub fn execute_turn(
    state: &mut PlayerState,
    board: &mut BoardState,
    action: IntermediatePlacement,
) -> Result<Placement, IllegalMove> {
    let tile = tile_from_hand(state, action.tile, action.rotation)?;
    validate_action(board, &tile, action.coordinate, state)?;
    let placement = board
        .place_tile(tile, action.coordinate)
        .map_err(IllegalMove::Simulation)?;
    state.hand.remove(action.tile);
    Ok(placement)
}
